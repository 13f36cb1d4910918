//! Community member repository.

use std::sync::Arc;

use crate::entities::{CommunityMember, community_member};
use clubhouse_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

/// Community member repository for database operations.
#[derive(Clone)]
pub struct CommunityMemberRepository {
    db: Arc<DatabaseConnection>,
}

impl CommunityMemberRepository {
    /// Create a new community member repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the user IDs of all members of a community, in store order.
    pub async fn find_member_ids(&self, community_id: &str) -> AppResult<Vec<String>> {
        CommunityMember::find()
            .select_only()
            .column(community_member::Column::UserId)
            .filter(community_member::Column::CommunityId.eq(community_id))
            .into_tuple::<String>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

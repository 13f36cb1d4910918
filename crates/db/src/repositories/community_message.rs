//! Community message repository.

use std::sync::Arc;

use crate::entities::community_message;
use clubhouse_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection};

/// Community message repository for database operations.
#[derive(Clone)]
pub struct CommunityMessageRepository {
    db: Arc<DatabaseConnection>,
}

impl CommunityMessageRepository {
    /// Create a new community message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new message.
    pub async fn create(
        &self,
        model: community_message::ActiveModel,
    ) -> AppResult<community_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

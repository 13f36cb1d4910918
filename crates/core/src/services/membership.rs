//! Community membership resolution.

use std::sync::Arc;

use async_trait::async_trait;
use clubhouse_common::{AppError, AppResult};
use clubhouse_db::repositories::CommunityMemberRepository;

/// Scoped membership query over the document store.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// User IDs of every member of `community_id`, in store order.
    async fn member_ids(&self, community_id: &str) -> AppResult<Vec<String>>;
}

#[async_trait]
impl MembershipStore for CommunityMemberRepository {
    async fn member_ids(&self, community_id: &str) -> AppResult<Vec<String>> {
        self.find_member_ids(community_id).await
    }
}

/// Resolves the member set of a community.
#[derive(Clone)]
pub struct MemberResolver {
    store: Arc<dyn MembershipStore>,
}

impl MemberResolver {
    /// Create a new member resolver.
    #[must_use]
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Get the member user IDs of a community.
    ///
    /// An empty result is a valid answer, not an error.
    pub async fn resolve(&self, community_id: &str) -> AppResult<Vec<String>> {
        if community_id.is_empty() {
            return Err(AppError::Validation(
                "community_id must not be empty".to_string(),
            ));
        }

        let members = self.store.member_ids(community_id).await?;
        tracing::debug!(
            community_id = %community_id,
            member_count = members.len(),
            "Resolved community members"
        );
        Ok(members)
    }
}

//! Push token repository.

use std::sync::Arc;

use sea_orm::{DatabaseConnection, EntityTrait};

use crate::entities::push_token::{Entity, Model};
use clubhouse_common::{AppError, AppResult};

/// Repository for push token lookups.
#[derive(Clone)]
pub struct PushTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl PushTokenRepository {
    /// Create a new push token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Point lookup of a user's push token.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_by_user_id_returns_token() {
        let token = Model {
            user_id: "bob".to_string(),
            token: "t1".to_string(),
            updated_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[token]])
                .into_connection(),
        );

        let repo = PushTokenRepository::new(db);
        let found = repo.find_by_user_id("bob").await.unwrap();

        assert_eq!(found.map(|t| t.token), Some("t1".to_string()));
    }

    #[tokio::test]
    async fn test_find_by_user_id_absent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = PushTokenRepository::new(db);

        assert!(repo.find_by_user_id("dana").await.unwrap().is_none());
    }
}

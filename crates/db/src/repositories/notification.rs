//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use clubhouse_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::OnConflict,
};

/// Result of an idempotent notification insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new row was written.
    Created,
    /// A row with the same dedupe key already exists.
    AlreadyExists,
}

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a notification unless one with the same dedupe key exists.
    pub async fn insert_if_absent(
        &self,
        model: notification::ActiveModel,
    ) -> AppResult<CreateOutcome> {
        let result = Notification::insert(model)
            .on_conflict(
                OnConflict::column(notification::Column::DedupeKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(DbErr::RecordNotInserted) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Get notifications for a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> AppResult<Vec<notification::Model>> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

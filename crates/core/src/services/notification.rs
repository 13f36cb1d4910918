//! Notification writing.

use std::sync::Arc;

use async_trait::async_trait;
use clubhouse_common::{AppError, AppResult, IdGenerator, dedupe_key};
use clubhouse_db::{
    entities::notification::{self, NotificationType},
    repositories::{CreateOutcome, NotificationRepository},
};
use futures::stream::{self, StreamExt};
use sea_orm::{NotSet, Set};

/// Fields of a notification record before the store assigns its ID and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Recipient.
    pub user_id: String,
    /// Always `NewMessage` for fan-out writes.
    pub notification_type: NotificationType,
    /// Human-readable body.
    pub message: String,
    /// The record the notification points at.
    pub reference_id: String,
    /// Idempotency key; a second create with the same key is a no-op.
    pub dedupe_key: String,
}

/// Notification persistence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Create the record unless one with the same dedupe key exists.
    async fn create_if_absent(&self, notification: NewNotification) -> AppResult<CreateOutcome>;
}

/// Build the insert model. `created_at` is left to the store's default.
fn active_model(notification: NewNotification) -> notification::ActiveModel {
    notification::ActiveModel {
        id: Set(IdGenerator::new().generate()),
        user_id: Set(notification.user_id),
        notification_type: Set(notification.notification_type),
        message: Set(notification.message),
        reference_id: Set(notification.reference_id),
        is_read: Set(false),
        dedupe_key: Set(notification.dedupe_key),
        created_at: NotSet,
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create_if_absent(&self, notification: NewNotification) -> AppResult<CreateOutcome> {
        self.insert_if_absent(active_model(notification)).await
    }
}

/// Outcome of writing one batch of notifications.
#[derive(Debug, Default)]
pub struct WriteSummary {
    /// Rows written by this invocation.
    pub created: usize,
    /// Rows already present from an earlier delivery of the same event.
    pub duplicates: usize,
    /// Recipients whose write failed.
    pub failures: Vec<(String, AppError)>,
}

impl WriteSummary {
    /// Whether every recipient has a notification record.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Persists one new-message notification per recipient.
#[derive(Clone)]
pub struct NotificationWriter {
    store: Arc<dyn NotificationStore>,
    concurrency: usize,
    body: String,
}

impl NotificationWriter {
    /// Create a new notification writer.
    #[must_use]
    pub fn new(store: Arc<dyn NotificationStore>, concurrency: usize, body: String) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
            body,
        }
    }

    /// Write a notification for every recipient of `message_id`.
    ///
    /// Each write is independent: a failure is recorded and the remaining
    /// writes still run to completion.
    pub async fn write_all(
        &self,
        message_id: &str,
        reference_id: &str,
        recipients: &[String],
    ) -> WriteSummary {
        let store = self.store.as_ref();
        let results: Vec<(String, AppResult<CreateOutcome>)> =
            stream::iter(recipients.iter().cloned())
                .map(|user_id: String| {
                    let notification = NewNotification {
                        user_id: user_id.clone(),
                        notification_type: NotificationType::NewMessage,
                        message: self.body.clone(),
                        reference_id: reference_id.to_string(),
                        dedupe_key: dedupe_key(message_id, &user_id),
                    };
                    async move {
                        let result = store.create_if_absent(notification).await;
                        (user_id, result)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut summary = WriteSummary::default();
        for (user_id, result) in results {
            match result {
                Ok(CreateOutcome::Created) => summary.created += 1,
                Ok(CreateOutcome::AlreadyExists) => {
                    tracing::info!(
                        user_id = %user_id,
                        "Notification already written by an earlier delivery"
                    );
                    summary.duplicates += 1;
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to write notification");
                    summary.failures.push((user_id, e));
                }
            }
        }
        summary
    }
}

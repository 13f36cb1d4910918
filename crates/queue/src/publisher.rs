//! Redis-backed message event publisher.
//!
//! Queues a [`MessageCreatedJob`] for the apalis fan-out worker each time a
//! message is posted.

use apalis::prelude::Storage;
use apalis_redis::RedisStorage;
use async_trait::async_trait;
use clubhouse_common::{AppError, AppResult};
use clubhouse_core::{MessageCreated, MessageEventPublisher};

use crate::jobs::MessageCreatedJob;

/// Redis-backed message event publisher.
#[derive(Clone)]
pub struct RedisMessageEventPublisher {
    storage: RedisStorage<MessageCreatedJob>,
}

impl RedisMessageEventPublisher {
    /// Create a new publisher over the job storage.
    #[must_use]
    pub const fn new(storage: RedisStorage<MessageCreatedJob>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl MessageEventPublisher for RedisMessageEventPublisher {
    async fn publish_message_created(&self, event: &MessageCreated) -> AppResult<()> {
        self.storage
            .clone()
            .push(MessageCreatedJob::new(event))
            .await
            .map_err(|e| AppError::Queue(format!("Failed to queue job: {e}")))?;

        tracing::debug!(
            message_id = %event.message_id,
            community_id = %event.community_id,
            "Queued message created job"
        );
        Ok(())
    }
}

//! Messaging service for community chats.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use clubhouse_common::{AppError, AppResult, IdGenerator};
use clubhouse_db::{entities::community_message, repositories::CommunityMessageRepository};
use sea_orm::Set;
use validator::Validate;

use super::message_fanout::MessageCreated;

/// Publishes "message created" events to the fan-out pipeline.
#[async_trait]
pub trait MessageEventPublisher: Send + Sync {
    /// Publish `event` for asynchronous fan-out.
    async fn publish_message_created(&self, event: &MessageCreated) -> AppResult<()>;
}

/// Input for posting a message to a community.
#[derive(Debug, Clone, Validate)]
pub struct CreateMessageInput {
    /// Target community.
    #[validate(length(min = 1, message = "community_id is required"))]
    pub community_id: String,
    /// Posting user.
    #[validate(length(min = 1, message = "sender_id is required"))]
    pub sender_id: String,
    /// Message text, 1 to 2000 characters.
    #[validate(length(min = 1, max = 2000, message = "text must be 1 to 2000 characters"))]
    pub text: String,
}

/// Messaging service.
#[derive(Clone)]
pub struct MessageService {
    message_repo: CommunityMessageRepository,
    event_publisher: Arc<dyn MessageEventPublisher>,
    id_gen: IdGenerator,
}

impl MessageService {
    /// Create a new messaging service.
    #[must_use]
    pub fn new(
        message_repo: CommunityMessageRepository,
        event_publisher: Arc<dyn MessageEventPublisher>,
    ) -> Self {
        Self {
            message_repo,
            event_publisher,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a message and announce it to the fan-out pipeline.
    ///
    /// The row is committed before the event is published. A publish failure
    /// is returned as an error but leaves the row in place.
    pub async fn post_message(
        &self,
        input: CreateMessageInput,
    ) -> AppResult<community_message::Model> {
        input.validate()?;
        if input.text.trim().is_empty() {
            return Err(AppError::Validation("text must not be blank".to_string()));
        }

        let model = community_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            community_id: Set(input.community_id),
            sender_id: Set(input.sender_id),
            text: Set(input.text),
            created_at: Set(Utc::now().into()),
        };

        let message = self.message_repo.create(model).await?;

        let event = MessageCreated {
            message_id: message.id.clone(),
            community_id: message.community_id.clone(),
            sender_id: message.sender_id.clone(),
            text: message.text.clone(),
        };

        self.event_publisher
            .publish_message_created(&event)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    message_id = %message.id,
                    error = %e,
                    "Failed to publish message created event"
                );
            })?;

        tracing::debug!(
            message_id = %message.id,
            community_id = %message.community_id,
            "Message posted"
        );

        Ok(message)
    }
}

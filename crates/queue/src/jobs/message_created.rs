//! Message created job.

use clubhouse_common::{AppError, AppResult};
use clubhouse_core::MessageCreated;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Job announcing a newly posted community message.
///
/// Fields are optional on the wire so a malformed payload still deserializes
/// and is rejected by validation instead of failing inside the queue backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageCreatedJob {
    /// The new message's ID.
    pub message_id: Option<String>,

    /// The community the message was posted to.
    pub community_id: Option<String>,

    /// The user who posted the message.
    pub sender_id: Option<String>,

    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
}

impl MessageCreatedJob {
    /// Create a new job from a message created event.
    #[must_use]
    pub fn new(event: &MessageCreated) -> Self {
        Self {
            message_id: Some(event.message_id.clone()),
            community_id: Some(event.community_id.clone()),
            sender_id: Some(event.sender_id.clone()),
            text: Some(event.text.clone()),
        }
    }
}

fn required(field: Option<String>, name: &str) -> AppResult<String> {
    field.ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

impl TryFrom<MessageCreatedJob> for MessageCreated {
    type Error = AppError;

    fn try_from(job: MessageCreatedJob) -> AppResult<Self> {
        let event = Self {
            message_id: required(job.message_id, "message_id")?,
            community_id: required(job.community_id, "community_id")?,
            sender_id: required(job.sender_id, "sender_id")?,
            text: job.text.unwrap_or_default(),
        };
        event.validate()?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_event() {
        let event = MessageCreated {
            message_id: "msg1".to_string(),
            community_id: "club1".to_string(),
            sender_id: "alice".to_string(),
            text: "hi".to_string(),
        };

        let restored = MessageCreated::try_from(MessageCreatedJob::new(&event)).unwrap();
        assert_eq!(restored, event);
    }

    #[test]
    fn test_missing_sender_is_rejected() {
        let job: MessageCreatedJob = serde_json::from_value(serde_json::json!({
            "message_id": "msg1",
            "community_id": "club1",
            "text": "hi"
        }))
        .unwrap();

        let err = MessageCreated::try_from(job).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("sender_id")));
    }

    #[test]
    fn test_empty_community_is_rejected() {
        let job = MessageCreatedJob {
            message_id: Some("msg1".to_string()),
            community_id: Some(String::new()),
            sender_id: Some("alice".to_string()),
            text: None,
        };

        let err = MessageCreated::try_from(job).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_missing_text_defaults_to_empty() {
        let job = MessageCreatedJob {
            message_id: Some("msg1".to_string()),
            community_id: Some("club1".to_string()),
            sender_id: Some("alice".to_string()),
            text: None,
        };

        let event = MessageCreated::try_from(job).unwrap();
        assert_eq!(event.text, "");
    }
}

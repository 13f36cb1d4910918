//! Message fan-out pipeline.
//!
//! Runs once per "message created" event:
//!
//! ```text
//! RECEIVED -> MEMBERS_RESOLVED -> FILTERED -> NOTIFICATIONS_WRITTEN -> PUSH_DISPATCHED
//!                             \-> SKIPPED_NO_MEMBERS
//! ```
//!
//! Notification writes and the push dispatch run concurrently once tokens are
//! resolved. Writes are keyed by `(message, recipient)`, so a redelivered event
//! fills in missing rows without duplicating the ones already committed.

use std::fmt;
use std::sync::Arc;

use clubhouse_common::{AppError, FanoutConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Instrument;
use validator::Validate;

use super::membership::{MemberResolver, MembershipStore};
use super::notification::{NotificationStore, NotificationWriter};
use super::push_notification::{MulticastReport, PushDispatcher, PushGateway, PushPayload};
use super::push_token::{TokenResolver, TokenStore};

/// A validated "message created" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MessageCreated {
    /// The new message's ID.
    #[validate(length(min = 1, message = "message_id is required"))]
    pub message_id: String,
    /// The community the message was posted to.
    #[validate(length(min = 1, message = "community_id is required"))]
    pub community_id: String,
    /// The poster; never notified of their own message.
    #[validate(length(min = 1, message = "sender_id is required"))]
    pub sender_id: String,
    /// Message text, the source of the push body.
    pub text: String,
}

/// Pipeline stage, carried on errors so failures name where they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutStage {
    /// Event field validation.
    Validate,
    /// Community membership query.
    ResolveMembers,
    /// Per-recipient push token lookups.
    ResolveTokens,
    /// Notification record writes.
    WriteNotifications,
    /// The multicast push send.
    DispatchPush,
}

impl fmt::Display for FanoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validate => "validate",
            Self::ResolveMembers => "resolve_members",
            Self::ResolveTokens => "resolve_tokens",
            Self::WriteNotifications => "write_notifications",
            Self::DispatchPush => "dispatch_push",
        };
        f.write_str(s)
    }
}

/// Terminal state of a successful invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutOutcome {
    /// The community has no members.
    SkippedNoMembers,
    /// Notifications written; no recipient had a push token.
    NotificationsWritten,
    /// Notifications written and one multicast push sent.
    PushDispatched,
}

/// Summary of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    /// Terminal state reached.
    pub outcome: FanoutOutcome,
    /// Members other than the sender.
    pub recipients: usize,
    /// Push tokens the multicast was addressed to.
    pub tokens: usize,
    /// Notification records written by this invocation.
    pub notifications_created: usize,
    /// Records already present from an earlier delivery.
    pub notifications_duplicated: usize,
    /// Gateway report, when a push was sent.
    pub push: Option<MulticastReport>,
}

impl FanoutReport {
    const fn skipped() -> Self {
        Self {
            outcome: FanoutOutcome::SkippedNoMembers,
            recipients: 0,
            tokens: 0,
            notifications_created: 0,
            notifications_duplicated: 0,
            push: None,
        }
    }
}

/// A failed invocation.
#[derive(Debug, Error)]
#[error("fan-out of message {message_id} failed at {stage}: {source}")]
pub struct FanoutError {
    /// The message whose fan-out failed.
    pub message_id: String,
    /// Where it failed.
    pub stage: FanoutStage,
    /// The underlying failure.
    #[source]
    pub source: AppError,
}

impl FanoutError {
    fn new(message_id: &str, stage: FanoutStage, source: AppError) -> Self {
        Self {
            message_id: message_id.to_string(),
            stage,
            source,
        }
    }

    /// Whether redelivering the event could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// Collapse per-recipient failures into one error naming the first.
fn partial_failure(
    failures: &mut Vec<(String, AppError)>,
    attempted: usize,
    what: &str,
) -> AppError {
    let count = failures.len();
    let (user_id, first) = failures.swap_remove(0);
    let detail = format!("{count} of {attempted} {what} failed; first ({user_id}): {first}");
    match first {
        AppError::Database(_) => AppError::Database(detail),
        AppError::ExternalService(_) => AppError::ExternalService(detail),
        _ => AppError::Internal(detail),
    }
}

/// Orchestrates the fan-out stages for one message.
#[derive(Clone)]
pub struct MessageFanoutService {
    members: MemberResolver,
    tokens: TokenResolver,
    writer: NotificationWriter,
    dispatcher: PushDispatcher,
    push_title: String,
    push_body_max_chars: usize,
}

impl MessageFanoutService {
    /// Wire the pipeline over its store and gateway capabilities.
    #[must_use]
    pub fn new(
        membership_store: Arc<dyn MembershipStore>,
        token_store: Arc<dyn TokenStore>,
        notification_store: Arc<dyn NotificationStore>,
        gateway: Arc<dyn PushGateway>,
        config: &FanoutConfig,
    ) -> Self {
        Self {
            members: MemberResolver::new(membership_store),
            tokens: TokenResolver::new(token_store, config.concurrency),
            writer: NotificationWriter::new(
                notification_store,
                config.concurrency,
                config.notification_body.clone(),
            ),
            dispatcher: PushDispatcher::new(gateway),
            push_title: config.push_title.clone(),
            push_body_max_chars: config.push_body_max_chars,
        }
    }

    /// Process one "message created" event.
    pub async fn process(&self, event: &MessageCreated) -> Result<FanoutReport, FanoutError> {
        let span = tracing::info_span!(
            "message_fanout",
            message_id = %event.message_id,
            community_id = %event.community_id,
        );
        self.run(event).instrument(span).await
    }

    async fn run(&self, event: &MessageCreated) -> Result<FanoutReport, FanoutError> {
        let message_id = event.message_id.as_str();

        event
            .validate()
            .map_err(|e| FanoutError::new(message_id, FanoutStage::Validate, e.into()))?;

        let members = self
            .members
            .resolve(&event.community_id)
            .await
            .map_err(|e| FanoutError::new(message_id, FanoutStage::ResolveMembers, e))?;

        if members.is_empty() {
            tracing::info!("Community has no members, nothing to notify");
            return Ok(FanoutReport::skipped());
        }

        let mut recipient_set = self.tokens.resolve(members, &event.sender_id).await;
        let fully_resolved = recipient_set.is_fully_resolved();
        let payload =
            PushPayload::for_message(&self.push_title, &event.text, self.push_body_max_chars);

        let push = async {
            if fully_resolved {
                self.dispatcher.dispatch(&recipient_set.tokens, &payload).await
            } else {
                tracing::warn!("Token resolution incomplete, withholding push until redelivery");
                Ok(None)
            }
        };
        let writes = self.writer.write_all(
            message_id,
            &event.community_id,
            &recipient_set.recipients,
        );

        let (mut write_summary, push_result) = tokio::join!(writes, push);

        if !fully_resolved {
            let attempted = recipient_set.recipients.len();
            let source =
                partial_failure(&mut recipient_set.lookup_failures, attempted, "token lookups");
            return Err(FanoutError::new(message_id, FanoutStage::ResolveTokens, source));
        }

        if !write_summary.is_complete() {
            let attempted = recipient_set.recipients.len();
            let source =
                partial_failure(&mut write_summary.failures, attempted, "notification writes");
            return Err(FanoutError::new(message_id, FanoutStage::WriteNotifications, source));
        }

        let push = push_result
            .map_err(|e| FanoutError::new(message_id, FanoutStage::DispatchPush, e))?;

        let report = FanoutReport {
            outcome: if push.is_some() {
                FanoutOutcome::PushDispatched
            } else {
                FanoutOutcome::NotificationsWritten
            },
            recipients: recipient_set.recipients.len(),
            tokens: recipient_set.tokens.len(),
            notifications_created: write_summary.created,
            notifications_duplicated: write_summary.duplicates,
            push,
        };

        tracing::info!(
            outcome = ?report.outcome,
            recipients = report.recipients,
            tokens = report.tokens,
            created = report.notifications_created,
            duplicates = report.notifications_duplicated,
            "Message fan-out complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryStore, RecordingPushGateway};

    fn event(sender: &str, text: &str) -> MessageCreated {
        MessageCreated {
            message_id: "msg1".to_string(),
            community_id: "club1".to_string(),
            sender_id: sender.to_string(),
            text: text.to_string(),
        }
    }

    fn service(
        store: &Arc<InMemoryStore>,
        gateway: &Arc<RecordingPushGateway>,
    ) -> MessageFanoutService {
        MessageFanoutService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            &FanoutConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_members_with_and_without_tokens() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob", "dana"])
                .with_token("bob", "t1"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());
        let text = "Practice is at six tonight, bring water";

        let report = service(&store, &gateway).process(&event("alice", text)).await.unwrap();

        assert_eq!(report.outcome, FanoutOutcome::PushDispatched);
        assert_eq!(report.recipients, 2);
        assert_eq!(report.notifications_created, 2);

        let mut notified: Vec<String> =
            store.notifications().into_iter().map(|n| n.user_id).collect();
        notified.sort();
        assert_eq!(notified, vec!["bob", "dana"]);
        assert!(store.notifications().iter().all(|n| !n.is_read));

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["t1"]);
        assert_eq!(calls[0].1.title, "New Message");
        assert_eq!(calls[0].1.body, text);
    }

    #[tokio::test]
    async fn test_sender_alone_gets_nothing() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice"])
                .with_token("alice", "t0"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());

        let report = service(&store, &gateway).process(&event("alice", "hello?")).await.unwrap();

        assert_eq!(report.outcome, FanoutOutcome::NotificationsWritten);
        assert_eq!(report.recipients, 0);
        assert!(store.notifications().is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_without_token_notified_but_not_pushed() {
        let store = Arc::new(InMemoryStore::new().with_members("club1", &["alice", "bob"]));
        let gateway = Arc::new(RecordingPushGateway::new());

        let report = service(&store, &gateway).process(&event("alice", "hi")).await.unwrap();

        assert_eq!(report.outcome, FanoutOutcome::NotificationsWritten);
        assert_eq!(store.notifications_for("bob").len(), 1);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_push_body_truncated_to_first_hundred_chars() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob"])
                .with_token("bob", "t1"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());
        let text: String = ('a'..='z').cycle().take(150).collect();

        service(&store, &gateway).process(&event("alice", &text)).await.unwrap();

        let calls = gateway.calls();
        assert_eq!(calls[0].1.body, text[..100]);
    }

    #[tokio::test]
    async fn test_empty_community_is_a_no_op() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingPushGateway::new());

        let report = service(&store, &gateway).process(&event("alice", "anyone?")).await.unwrap();

        assert_eq!(report.outcome, FanoutOutcome::SkippedNoMembers);
        assert!(store.notifications().is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sender_not_a_member_notifies_everyone() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["bob", "dana"])
                .with_token("bob", "t1")
                .with_token("dana", "t2"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());

        let report = service(&store, &gateway)
            .process(&event("admin", "Club fair Friday"))
            .await
            .unwrap();

        assert_eq!(report.recipients, 2);
        let mut pushed = gateway.calls()[0].0.clone();
        pushed.sort();
        assert_eq!(pushed, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_malformed_event_fails_before_side_effects() {
        let store = Arc::new(InMemoryStore::new().with_members("club1", &["alice", "bob"]));
        let gateway = Arc::new(RecordingPushGateway::new());
        let mut bad = event("alice", "hi");
        bad.sender_id = String::new();

        let err = service(&store, &gateway).process(&bad).await.unwrap_err();

        assert_eq!(err.stage, FanoutStage::Validate);
        assert!(!err.is_retryable());
        assert!(store.notifications().is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_membership_failure_reports_stage() {
        let store = Arc::new(InMemoryStore::new().fail_membership_query());
        let gateway = Arc::new(RecordingPushGateway::new());

        let err = service(&store, &gateway).process(&event("alice", "hi")).await.unwrap_err();

        assert_eq!(err.stage, FanoutStage::ResolveMembers);
        assert_eq!(err.message_id, "msg1");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_write_failure_isolated_then_reported() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob", "dana"])
                .with_token("bob", "t1")
                .fail_write_for("dana"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());

        let err = service(&store, &gateway).process(&event("alice", "hi")).await.unwrap_err();

        assert_eq!(err.stage, FanoutStage::WriteNotifications);
        assert!(err.is_retryable());
        assert_eq!(store.notifications_for("bob").len(), 1);
        // Push does not depend on the writes
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_token_lookup_failure_withholds_push() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob", "dana"])
                .with_token("bob", "t1")
                .fail_token_lookup_for("dana"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());

        let err = service(&store, &gateway).process(&event("alice", "hi")).await.unwrap_err();

        assert_eq!(err.stage, FanoutStage::ResolveTokens);
        assert!(gateway.calls().is_empty());
        // Both recipients are still notified
        assert_eq!(store.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_gateway_failure_after_writes() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob"])
                .with_token("bob", "t1"),
        );
        let gateway = Arc::new(RecordingPushGateway::failing());

        let err = service(&store, &gateway).process(&event("alice", "hi")).await.unwrap_err();

        assert_eq!(err.stage, FanoutStage::DispatchPush);
        assert_eq!(store.notifications_for("bob").len(), 1);
    }

    #[tokio::test]
    async fn test_redelivery_does_not_duplicate_notifications() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob", "dana"])
                .with_token("bob", "t1"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());
        let svc = service(&store, &gateway);

        svc.process(&event("alice", "hi")).await.unwrap();
        let again = svc.process(&event("alice", "hi")).await.unwrap();

        assert_eq!(again.notifications_created, 0);
        assert_eq!(again.notifications_duplicated, 2);
        assert_eq!(store.notifications().len(), 2);
    }

    #[tokio::test]
    async fn test_exactly_one_record_per_non_sender_member() {
        let ids: Vec<String> = (0..40).map(|i| format!("member{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut store = InMemoryStore::new().with_members("club1", &refs);
        for id in refs.iter().step_by(3) {
            store = store.with_token(id, &format!("tok-{id}"));
        }
        let store = Arc::new(store);
        let gateway = Arc::new(RecordingPushGateway::new());

        let report = service(&store, &gateway).process(&event("member0", "hi")).await.unwrap();

        assert_eq!(report.recipients, 39);
        assert_eq!(store.notifications().len(), 39);
        assert!(store.notifications_for("member0").is_empty());
        // member0 holds a token but is the sender
        assert_eq!(gateway.calls()[0].0.len(), report.tokens);
        assert_eq!(report.tokens, 13);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_process_runs_on_spawned_task() {
        let store = Arc::new(
            InMemoryStore::new()
                .with_members("club1", &["alice", "bob", "dana"])
                .with_token("bob", "t1")
                .with_token("dana", "t2"),
        );
        let gateway = Arc::new(RecordingPushGateway::new());
        let svc = service(&store, &gateway);
        let ev = event("alice", "hi");

        let report = tokio::spawn(async move { svc.process(&ev).await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.outcome, FanoutOutcome::PushDispatched);
        assert_eq!(store.notifications().len(), 2);
        assert_eq!(gateway.calls().len(), 1);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(FanoutStage::ResolveTokens.to_string(), "resolve_tokens");
        assert_eq!(FanoutStage::DispatchPush.to_string(), "dispatch_push");
    }
}

//! In-memory stores and gateways for exercising services without a database.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use clubhouse_common::{AppError, AppResult, IdGenerator};
use clubhouse_db::entities::notification;
use clubhouse_db::repositories::CreateOutcome;

use crate::services::{
    MembershipStore, MessageCreated, MessageEventPublisher, MulticastReport, NewNotification,
    NotificationStore, PushGateway, PushPayload, TokenResult, TokenStore,
};

/// Membership, token and notification store backed by hash maps.
#[derive(Default)]
pub struct InMemoryStore {
    members: HashMap<String, Vec<String>>,
    tokens: HashMap<String, String>,
    notifications: Mutex<Vec<notification::Model>>,
    fail_membership: bool,
    fail_token_lookups: HashSet<String>,
    fail_writes: HashSet<String>,
}

impl InMemoryStore {
    /// An empty store with no injected failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_ids` as members of `community_id`, in order.
    #[must_use]
    pub fn with_members(mut self, community_id: &str, user_ids: &[&str]) -> Self {
        self.members
            .entry(community_id.to_string())
            .or_default()
            .extend(user_ids.iter().map(ToString::to_string));
        self
    }

    /// Register `token` as the push token of `user_id`.
    #[must_use]
    pub fn with_token(mut self, user_id: &str, token: &str) -> Self {
        self.tokens.insert(user_id.to_string(), token.to_string());
        self
    }

    /// Make every membership query fail.
    #[must_use]
    pub fn fail_membership_query(mut self) -> Self {
        self.fail_membership = true;
        self
    }

    /// Make token lookups for `user_id` fail.
    #[must_use]
    pub fn fail_token_lookup_for(mut self, user_id: &str) -> Self {
        self.fail_token_lookups.insert(user_id.to_string());
        self
    }

    /// Make notification writes for `user_id` fail.
    #[must_use]
    pub fn fail_write_for(mut self, user_id: &str) -> Self {
        self.fail_writes.insert(user_id.to_string());
        self
    }

    /// Every notification written so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<notification::Model> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifications written for `user_id`.
    #[must_use]
    pub fn notifications_for(&self, user_id: &str) -> Vec<notification::Model> {
        self.notifications()
            .into_iter()
            .filter(|n| n.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn member_ids(&self, community_id: &str) -> AppResult<Vec<String>> {
        if self.fail_membership {
            return Err(AppError::Database("membership query failed".to_string()));
        }
        Ok(self.members.get(community_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn token_for(&self, user_id: &str) -> AppResult<Option<String>> {
        if self.fail_token_lookups.contains(user_id) {
            return Err(AppError::Database(format!("token lookup failed for {user_id}")));
        }
        Ok(self.tokens.get(user_id).cloned())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn create_if_absent(&self, new: NewNotification) -> AppResult<CreateOutcome> {
        if self.fail_writes.contains(&new.user_id) {
            return Err(AppError::Database(format!("write failed for {}", new.user_id)));
        }

        let mut rows = self
            .notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if rows.iter().any(|n| n.dedupe_key == new.dedupe_key) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        rows.push(notification::Model {
            id: IdGenerator::new().generate(),
            user_id: new.user_id,
            notification_type: new.notification_type,
            message: new.message,
            reference_id: new.reference_id,
            is_read: false,
            dedupe_key: new.dedupe_key,
            created_at: Utc::now().into(),
        });
        Ok(CreateOutcome::Created)
    }
}

/// Push gateway that records every multicast call.
#[derive(Default)]
pub struct RecordingPushGateway {
    calls: Mutex<Vec<(Vec<String>, PushPayload)>>,
    fail: bool,
}

impl RecordingPushGateway {
    /// A gateway that accepts every token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose sends always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every `(tokens, payload)` pair sent so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(Vec<String>, PushPayload)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PushGateway for RecordingPushGateway {
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> AppResult<MulticastReport> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((tokens.to_vec(), payload.clone()));

        if self.fail {
            return Err(AppError::ExternalService("push gateway unavailable".to_string()));
        }

        Ok(MulticastReport {
            success_count: tokens.len(),
            failure_count: 0,
            results: tokens
                .iter()
                .enumerate()
                .map(|(i, _)| TokenResult {
                    message_id: Some(format!("m-{i}")),
                    error: None,
                })
                .collect(),
        })
    }
}

/// Event publisher that records published events.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<MessageCreated>>,
    fail: bool,
}

impl RecordingEventPublisher {
    /// A publisher that accepts every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose publishes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every event published so far.
    #[must_use]
    pub fn events(&self) -> Vec<MessageCreated> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MessageEventPublisher for RecordingEventPublisher {
    async fn publish_message_created(&self, event: &MessageCreated) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Queue("queue unavailable".to_string()));
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

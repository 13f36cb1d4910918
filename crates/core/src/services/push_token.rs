//! Recipient filtering and push token resolution.

use std::sync::Arc;

use async_trait::async_trait;
use clubhouse_common::{AppError, AppResult};
use clubhouse_db::repositories::PushTokenRepository;
use futures::stream::{self, StreamExt};

/// Point lookup of delivery tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// The registered push token of `user_id`, if any.
    async fn token_for(&self, user_id: &str) -> AppResult<Option<String>>;
}

#[async_trait]
impl TokenStore for PushTokenRepository {
    async fn token_for(&self, user_id: &str) -> AppResult<Option<String>> {
        Ok(self.find_by_user_id(user_id).await?.map(|t| t.token))
    }
}

/// Output of recipient filtering.
///
/// `recipients` and `tokens` carry no ordering guarantee.
#[derive(Debug, Default)]
pub struct RecipientSet {
    /// Every member except the sender.
    pub recipients: Vec<String>,
    /// Tokens of recipients that have one registered.
    pub tokens: Vec<String>,
    /// Recipients whose token lookup failed.
    pub lookup_failures: Vec<(String, AppError)>,
}

impl RecipientSet {
    /// Whether every recipient's token lookup completed.
    #[must_use]
    pub fn is_fully_resolved(&self) -> bool {
        self.lookup_failures.is_empty()
    }
}

/// Excludes the sender and resolves each remaining member's push token.
#[derive(Clone)]
pub struct TokenResolver {
    store: Arc<dyn TokenStore>,
    concurrency: usize,
}

impl TokenResolver {
    /// Create a new token resolver issuing at most `concurrency` lookups at once.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Partition `members` into recipients and resolved tokens.
    ///
    /// A missing token only omits the member from `tokens`. A failed lookup is
    /// collected in `lookup_failures` and never aborts the other lookups.
    pub async fn resolve(&self, members: Vec<String>, sender_id: &str) -> RecipientSet {
        let recipients: Vec<String> = members
            .into_iter()
            .filter(|member_id| member_id != sender_id)
            .collect();

        let store = self.store.as_ref();
        let lookups: Vec<(String, AppResult<Option<String>>)> =
            stream::iter(recipients.iter().cloned())
                .map(|user_id: String| async move {
                    let result = store.token_for(&user_id).await;
                    (user_id, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut tokens = Vec::with_capacity(lookups.len());
        let mut lookup_failures = Vec::new();

        for (user_id, result) in lookups {
            match result {
                Ok(Some(token)) if !token.trim().is_empty() => tokens.push(token),
                Ok(_) => {
                    tracing::debug!(user_id = %user_id, "No push token registered");
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Push token lookup failed");
                    lookup_failures.push((user_id, e));
                }
            }
        }

        RecipientSet {
            recipients,
            tokens,
            lookup_failures,
        }
    }
}

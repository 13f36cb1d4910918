//! Push delivery through a multicast gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clubhouse_common::{AppError, AppResult, PushConfig};
use serde::{Deserialize, Serialize};
use url::Url;

/// Push notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
}

impl PushPayload {
    /// Build the payload announcing a new community message.
    #[must_use]
    pub fn for_message(title: &str, text: &str, max_body_chars: usize) -> Self {
        Self {
            title: title.to_string(),
            body: truncate_chars(text, max_body_chars),
        }
    }
}

/// The first `max_chars` characters of `text`, or all of it when shorter.
///
/// Counts Unicode scalar values, so multi-byte characters are never split.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Per-token result in a multicast report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResult {
    /// Gateway message ID on success.
    pub message_id: Option<String>,
    /// Gateway error code on failure.
    pub error: Option<String>,
}

/// Delivery report returned by the gateway for one multicast send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MulticastReport {
    /// Tokens the gateway accepted.
    #[serde(rename = "success", default)]
    pub success_count: usize,
    /// Tokens the gateway rejected.
    #[serde(rename = "failure", default)]
    pub failure_count: usize,
    /// Per-token results, in request order.
    #[serde(default)]
    pub results: Vec<TokenResult>,
}

/// Remote multicast push endpoint.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Send one push message to every token in a single request.
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> AppResult<MulticastReport>;
}

#[derive(Serialize)]
struct MulticastRequest<'a> {
    registration_ids: &'a [String],
    notification: &'a PushPayload,
}

/// HTTP multicast gateway client.
#[derive(Clone)]
pub struct HttpPushGateway {
    http_client: reqwest::Client,
    endpoint: Url,
    server_key: String,
}

impl HttpPushGateway {
    /// Create a gateway client from configuration.
    pub fn new(config: &PushConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build push HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            server_key: config.server_key.clone(),
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send_multicast(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> AppResult<MulticastReport> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("Authorization", format!("key={}", self.server_key))
            .json(&MulticastRequest {
                registration_ids: tokens,
                notification: payload,
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Push request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Push gateway returned {status}: {body}"
            )));
        }

        response
            .json::<MulticastReport>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid push gateway response: {e}")))
    }
}

/// Gateway used when push delivery is not configured.
#[derive(Clone, Default)]
pub struct DisabledPushGateway;

#[async_trait]
impl PushGateway for DisabledPushGateway {
    async fn send_multicast(
        &self,
        tokens: &[String],
        _payload: &PushPayload,
    ) -> AppResult<MulticastReport> {
        tracing::debug!(
            token_count = tokens.len(),
            "Push delivery disabled, not sending"
        );
        Ok(MulticastReport::default())
    }
}

/// Issues the single multicast send for a message.
#[derive(Clone)]
pub struct PushDispatcher {
    gateway: Arc<dyn PushGateway>,
}

impl PushDispatcher {
    /// Create a new push dispatcher.
    #[must_use]
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }

    /// Send `payload` to `tokens` in one call.
    ///
    /// Returns `None` without contacting the gateway when `tokens` is empty.
    pub async fn dispatch(
        &self,
        tokens: &[String],
        payload: &PushPayload,
    ) -> AppResult<Option<MulticastReport>> {
        if tokens.is_empty() {
            tracing::debug!("No push tokens resolved, skipping push");
            return Ok(None);
        }

        let report = self.gateway.send_multicast(tokens, payload).await?;

        if report.failure_count > 0 {
            tracing::warn!(
                token_count = tokens.len(),
                success = report.success_count,
                failure = report.failure_count,
                "Push delivered with per-token failures"
            );
        } else {
            tracing::info!(
                token_count = tokens.len(),
                success = report.success_count,
                "Push delivered"
            );
        }

        Ok(Some(report))
    }
}

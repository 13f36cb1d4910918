//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration (event queue backend).
    pub redis: RedisConfig,
    /// Push gateway configuration. Push delivery is disabled when absent.
    #[serde(default)]
    pub push: Option<PushConfig>,
    /// Message fan-out configuration.
    #[serde(default)]
    pub fanout: FanoutConfig,
    /// Queue worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
}

/// Multicast push gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Multicast send endpoint.
    pub endpoint: Url,
    /// Server key sent in the `Authorization` header.
    pub server_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_push_timeout_secs")]
    pub timeout_secs: u64,
}

/// Message fan-out configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FanoutConfig {
    /// Maximum in-flight store calls per fan-out stage.
    #[serde(default = "default_fanout_concurrency")]
    pub concurrency: usize,
    /// Title of the push payload.
    #[serde(default = "default_push_title")]
    pub push_title: String,
    /// Body stored on every new-message notification record.
    #[serde(default = "default_notification_body")]
    pub notification_body: String,
    /// Number of message characters carried in the push body.
    #[serde(default = "default_push_body_max_chars")]
    pub push_body_max_chars: usize,
}

/// Queue worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Redelivery attempts for a failed invocation.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Invocations processed in parallel.
    #[serde(default = "default_worker_concurrency")]
    pub concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: default_fanout_concurrency(),
            push_title: default_push_title(),
            notification_body: default_notification_body(),
            push_body_max_chars: default_push_body_max_chars(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            concurrency: default_worker_concurrency(),
        }
    }
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_push_timeout_secs() -> u64 {
    10
}

const fn default_fanout_concurrency() -> usize {
    16
}

fn default_push_title() -> String {
    "New Message".to_string()
}

fn default_notification_body() -> String {
    "New message in your community".to_string()
}

const fn default_push_body_max_chars() -> usize {
    100
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_worker_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `CLUBHOUSE_ENV`)
    /// 3. Environment variables with `CLUBHOUSE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("CLUBHOUSE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CLUBHOUSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CLUBHOUSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Reject settings that would stall or break the pipeline.
    fn validated(self) -> Result<Self, config::ConfigError> {
        if self.fanout.concurrency == 0 {
            return Err(config::ConfigError::Message(
                "fanout.concurrency must be at least 1".to_string(),
            ));
        }
        if self.fanout.push_body_max_chars == 0 {
            return Err(config::ConfigError::Message(
                "fanout.push_body_max_chars must be at least 1".to_string(),
            ));
        }
        if self.worker.concurrency == 0 {
            return Err(config::ConfigError::Message(
                "worker.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

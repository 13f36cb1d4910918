//! Redelivery policy for failed fan-out jobs.

use apalis::layers::retry::RetryPolicy;
use clubhouse_common::WorkerConfig;

/// How often a failed job is redelivered before it is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of redeliveries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 5 }
    }
}

impl From<&WorkerConfig> for RetryConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
        }
    }
}

impl RetryConfig {
    /// The apalis retry policy applying this configuration.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::retries(self.max_retries as usize)
    }

    /// Total number of times a job may run.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_five_redeliveries() {
        let config = RetryConfig::default();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.max_attempts(), 6);
    }

    #[test]
    fn test_from_worker_config() {
        let worker = WorkerConfig {
            max_retries: 2,
            ..WorkerConfig::default()
        };

        let config = RetryConfig::from(&worker);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_attempts(), 3);
    }

    #[test]
    fn test_zero_retries_runs_once() {
        let config = RetryConfig { max_retries: 0 };

        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn test_saturating_attempts() {
        let config = RetryConfig { max_retries: u32::MAX };

        assert_eq!(config.max_attempts(), u32::MAX);
    }
}

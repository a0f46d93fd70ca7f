//! Ledger client configuration.
//!
//! Retry and polling bounds for [`LedgerClient`](crate::LedgerClient).
//! Defaults match a ledger that confirms within seconds; override via
//! environment variables or explicit construction in tests.

use std::time::Duration;

/// Retry and confirmation bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Retries after the first submission attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay_ms: u64,
    /// Interval between confirmation polls.
    pub poll_interval_ms: u64,
    /// Give up waiting for confirmation after this long.
    pub confirmation_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            poll_interval_ms: 500,
            confirmation_timeout_secs: 30,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CCV_LEDGER_MAX_RETRIES` (default: 3)
    /// - `CCV_LEDGER_BASE_DELAY_MS` (default: 200)
    /// - `CCV_LEDGER_POLL_INTERVAL_MS` (default: 500)
    /// - `CCV_LEDGER_CONFIRM_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_retries: env_parse("CCV_LEDGER_MAX_RETRIES", defaults.max_retries)?,
            base_delay_ms: env_parse("CCV_LEDGER_BASE_DELAY_MS", defaults.base_delay_ms)?,
            poll_interval_ms: env_parse("CCV_LEDGER_POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            confirmation_timeout_secs: env_parse(
                "CCV_LEDGER_CONFIRM_TIMEOUT_SECS",
                defaults.confirmation_timeout_secs,
            )?,
        };
        if config.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "CCV_LEDGER_POLL_INTERVAL_MS".to_string(),
                "0".to_string(),
            ));
        }
        Ok(config)
    }

    /// A configuration with millisecond delays, for tests and simulations.
    pub fn fast() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1,
            poll_interval_ms: 1,
            confirmation_timeout_secs: 2,
        }
    }

    /// Backoff before retry number `retry` (0-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(2u64.saturating_pow(retry)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let config = LedgerConfig::default();
        assert_eq!(config.retry_delay(0), Duration::from_millis(200));
        assert_eq!(config.retry_delay(1), Duration::from_millis(400));
        assert_eq!(config.retry_delay(2), Duration::from_millis(800));
    }

    #[test]
    fn backoff_saturates() {
        let config = LedgerConfig {
            base_delay_ms: u64::MAX,
            ..LedgerConfig::default()
        };
        assert_eq!(config.retry_delay(40), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("CCV_TEST_BAD_RETRIES", "lots");
        let result = env_parse::<u32>("CCV_TEST_BAD_RETRIES", 3);
        std::env::remove_var("CCV_TEST_BAD_RETRIES");
        assert!(result.is_err());
    }
}

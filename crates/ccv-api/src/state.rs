//! # Application State
//!
//! Shared state handed to every handler through the `State` extractor.
//! The registry and ledger client are built once at startup and injected;
//! nothing here is global.

use std::path::PathBuf;
use std::sync::Arc;

use ccv_crypto::Ed25519KeyPair;
use ccv_ledger::{LedgerClient, LedgerConfig, MockLedgerAdapter};
use ccv_settlement::{CircleRegistry, SettlementConfig};
use metrics_exporter_prometheus::PrometheusHandle;

/// Server configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bearer secret. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Serve Prometheus metrics at `/metrics`.
    pub metrics_enabled: bool,
    /// Append-only ledger log. `None` uses the in-memory mock ledger.
    pub ledger_log: Option<PathBuf>,
    /// Hex-encoded Ed25519 seed of the operator key. `None` generates an
    /// ephemeral key.
    pub operator_key: Option<String>,
    /// Interval of the background overdue-round scan.
    pub overdue_scan_secs: u64,
    pub settlement: SettlementConfig,
    pub ledger: LedgerConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("metrics_enabled", &self.metrics_enabled)
            .field("ledger_log", &self.ledger_log)
            .field("operator_key", &self.operator_key.as_ref().map(|_| "[REDACTED]"))
            .field("overdue_scan_secs", &self.overdue_scan_secs)
            .field("settlement", &self.settlement)
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            metrics_enabled: false,
            ledger_log: None,
            operator_key: None,
            overdue_scan_secs: 300,
            settlement: SettlementConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `AUTH_TOKEN` (optional)
    /// - `CCV_METRICS_ENABLED` (`true`/`false`, default: false)
    /// - `CCV_LEDGER_LOG` (optional path)
    /// - `CCV_OPERATOR_KEY` (optional 64-char hex seed)
    /// - `CCV_OVERDUE_SCAN_SECS` (default: 300)
    ///
    /// plus the settlement and ledger variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_parse("PORT", defaults.port)?,
            auth_token: env_nonempty("AUTH_TOKEN"),
            metrics_enabled: env_parse("CCV_METRICS_ENABLED", defaults.metrics_enabled)?,
            ledger_log: env_nonempty("CCV_LEDGER_LOG").map(PathBuf::from),
            operator_key: env_nonempty("CCV_OPERATOR_KEY"),
            overdue_scan_secs: env_parse("CCV_OVERDUE_SCAN_SECS", defaults.overdue_scan_secs)?,
            settlement: SettlementConfig::from_env()
                .map_err(|e| ConfigError::Settlement(e.to_string()))?,
            ledger: LedgerConfig::from_env().map_err(|e| ConfigError::Ledger(e.to_string()))?,
        })
    }
}

fn env_nonempty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
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
    #[error("settlement configuration: {0}")]
    Settlement(String),
    #[error("ledger configuration: {0}")]
    Ledger(String),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CircleRegistry>,
    pub ledger: LedgerClient,
    pub config: Arc<AppConfig>,
    /// Prometheus render handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("circles", &self.registry.len())
            .field("ledger", &self.ledger)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// State with default configuration, the mock ledger, and an ephemeral
    /// operator key.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// State with the given configuration, the mock ledger, and an
    /// ephemeral operator key.
    pub fn with_config(config: AppConfig) -> Self {
        let registry = CircleRegistry::new(config.settlement.clone());
        let ledger = LedgerClient::new(
            Arc::new(MockLedgerAdapter::new()),
            Arc::new(Ed25519KeyPair::generate()),
            config.ledger.clone(),
        );
        Self::from_parts(config, registry, ledger)
    }

    pub fn from_parts(config: AppConfig, registry: CircleRegistry, ledger: LedgerClient) -> Self {
        Self {
            registry: Arc::new(registry),
            ledger,
            config: Arc::new(config),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

//! # Startup Bootstrap
//!
//! Builds [`AppState`] from [`AppConfig`]:
//!
//! 1. **Operator key**: from `CCV_OPERATOR_KEY`, or an ephemeral key.
//! 2. **Ledger adapter**: the append-only log at `CCV_LEDGER_LOG`, or the
//!    in-memory mock.
//! 3. **Registry**: empty, with the configured settlement limits.

use std::sync::Arc;

use ccv_crypto::Ed25519KeyPair;
use ccv_ledger::{AppendOnlyLogAdapter, LedgerAdapter, LedgerClient, LedgerError, MockLedgerAdapter};
use ccv_settlement::CircleRegistry;

use crate::state::{AppConfig, AppState};

/// Errors during startup.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The operator key could not be loaded.
    #[error("operator key error: {0}")]
    OperatorKey(String),

    /// The ledger log could not be opened.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Build application state from configuration.
pub fn bootstrap(config: AppConfig) -> Result<AppState, BootstrapError> {
    let signer = match &config.operator_key {
        Some(seed) => Ed25519KeyPair::from_seed_hex(seed)
            .map_err(|e| BootstrapError::OperatorKey(e.to_string()))?,
        None => {
            tracing::warn!("CCV_OPERATOR_KEY not set, using an ephemeral operator key");
            Ed25519KeyPair::generate()
        }
    };

    let adapter: Arc<dyn LedgerAdapter> = match &config.ledger_log {
        Some(path) => Arc::new(AppendOnlyLogAdapter::open(path)?),
        None => {
            tracing::warn!("CCV_LEDGER_LOG not set, ledger entries are kept in memory only");
            Arc::new(MockLedgerAdapter::new())
        }
    };

    let ledger = LedgerClient::new(adapter, Arc::new(signer), config.ledger.clone());
    let registry = CircleRegistry::new(config.settlement.clone());

    tracing::info!(
        ledger = ledger.adapter_name(),
        operator_key = %ledger.operator_key(),
        auth = config.auth_token.is_some(),
        metrics = config.metrics_enabled,
        "bootstrap complete"
    );
    Ok(AppState::from_parts(config, registry, ledger))
}

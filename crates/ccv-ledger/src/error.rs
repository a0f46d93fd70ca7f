//! Ledger client error types.

use ccv_core::{CanonicalizationError, IdempotencyKey};

use crate::config::ConfigError;
use crate::types::TransactionHandle;

/// Errors from ledger adapters and the ledger client.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger could not be reached. Retried by the client.
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },

    /// The ledger did not answer in time. Retried by the client.
    #[error("ledger request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The ledger refused the transaction. Not retried.
    #[error("transaction rejected by {adapter}: {reason}")]
    Rejected { adapter: String, reason: String },

    /// The intent's signature does not verify against its signer.
    #[error("intent signature invalid: {0}")]
    InvalidSignature(String),

    /// No transaction with this handle.
    #[error("transaction {handle} not found")]
    NotFound { handle: TransactionHandle },

    /// Every attempt failed; the initiating action must be treated as failed.
    #[error("submission {idempotency_key} failed after {attempts} attempts: {last_error}")]
    SubmissionFailed {
        idempotency_key: IdempotencyKey,
        attempts: u32,
        last_error: String,
    },

    /// The transaction was neither confirmed nor failed in time.
    #[error("transaction {handle} not confirmed within {waited_ms}ms")]
    ConfirmationTimeout {
        handle: TransactionHandle,
        waited_ms: u64,
    },

    /// Intent parameters could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The append-only log could not be read or written.
    #[error("ledger log I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The append-only log contains a line that does not parse.
    #[error("ledger log {path} corrupt at line {line}: {reason}")]
    Corrupt {
        path: String,
        line: usize,
        reason: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    /// Whether a retry with the same idempotency key may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_transient() {
        assert!(LedgerError::Unavailable {
            reason: "connection refused".into()
        }
        .is_transient());
        assert!(LedgerError::Timeout { elapsed_ms: 5000 }.is_transient());
        assert!(!LedgerError::Rejected {
            adapter: "mock".into(),
            reason: "duplicate circle".into()
        }
        .is_transient());
        assert!(!LedgerError::InvalidSignature("bad".into()).is_transient());
    }
}

//! The seam between the ledger client and a concrete ledger.

use crate::error::LedgerError;
use crate::types::{SignedIntent, TransactionHandle, TransactionStatus};

/// A ledger that records signed intents.
///
/// Implementations must be idempotent on the intent's key: submitting an
/// intent whose key was already accepted returns the original handle and
/// records nothing new. Calls may block; the client runs them off the
/// async executor.
pub trait LedgerAdapter: Send + Sync {
    /// Record a signed intent, returning its handle.
    fn submit_transaction(&self, intent: &SignedIntent) -> Result<TransactionHandle, LedgerError>;

    /// Current status of a previously submitted transaction.
    fn get_transaction_status(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, LedgerError>;

    /// Name used in logs and rejection errors.
    fn adapter_name(&self) -> &str;
}

//! In-memory ledger for tests, simulations, and local development.

use std::collections::HashMap;

use ccv_core::IdempotencyKey;
use parking_lot::Mutex;

use crate::adapter::LedgerAdapter;
use crate::error::LedgerError;
use crate::types::{SignedIntent, TransactionHandle, TransactionStatus};

#[derive(Debug)]
struct Entry {
    intent: SignedIntent,
    polls: u32,
}

#[derive(Debug, Default)]
struct MockState {
    by_key: HashMap<IdempotencyKey, TransactionHandle>,
    entries: HashMap<TransactionHandle, Entry>,
    seq: u64,
    attempts: u32,
    fail_next: u32,
}

/// Mock ledger adapter.
///
/// Test conventions:
/// - the next `n` submissions fail with `Unavailable` after
///   [`fail_next_submissions`](Self::fail_next_submissions)
/// - a transaction reports `Pending` for the first `confirm_after` status
///   polls, then `Confirmed`
/// - intents whose params carry `"reject": true` fail with `Rejected`
#[derive(Debug, Default)]
pub struct MockLedgerAdapter {
    state: Mutex<MockState>,
    confirm_after: u32,
}

impl MockLedgerAdapter {
    /// A ledger that confirms on the first status poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that reports `Pending` for `polls` status polls first.
    pub fn confirming_after(polls: u32) -> Self {
        Self {
            confirm_after: polls,
            ..Self::default()
        }
    }

    pub fn fail_next_submissions(&self, n: u32) {
        self.state.lock().fail_next = n;
    }

    /// Distinct transactions recorded.
    pub fn entry_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Submission calls seen, including failed ones.
    pub fn submission_attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    pub fn intent(&self, handle: &TransactionHandle) -> Option<SignedIntent> {
        self.state
            .lock()
            .entries
            .get(handle)
            .map(|e| e.intent.clone())
    }
}

impl LedgerAdapter for MockLedgerAdapter {
    fn submit_transaction(&self, intent: &SignedIntent) -> Result<TransactionHandle, LedgerError> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(LedgerError::Unavailable {
                reason: "mock ledger offline".to_string(),
            });
        }
        intent.verify()?;
        if let Some(existing) = state.by_key.get(intent.idempotency_key()) {
            return Ok(existing.clone());
        }
        if intent.intent.params.get("reject") == Some(&serde_json::Value::Bool(true)) {
            return Err(LedgerError::Rejected {
                adapter: self.adapter_name().to_string(),
                reason: "rejected by test convention".to_string(),
            });
        }

        state.seq += 1;
        let handle = TransactionHandle::new(format!("mock-{:08}", state.seq));
        state
            .by_key
            .insert(intent.idempotency_key().clone(), handle.clone());
        state.entries.insert(
            handle.clone(),
            Entry {
                intent: intent.clone(),
                polls: 0,
            },
        );
        Ok(handle)
    }

    fn get_transaction_status(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, LedgerError> {
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(handle)
            .ok_or_else(|| LedgerError::NotFound {
                handle: handle.clone(),
            })?;
        entry.polls += 1;
        if entry.polls > self.confirm_after {
            Ok(TransactionStatus::Confirmed)
        } else {
            Ok(TransactionStatus::Pending)
        }
    }

    fn adapter_name(&self) -> &str {
        "MockLedgerAdapter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LedgerAction, TransactionIntent};
    use ccv_core::Timestamp;
    use ccv_crypto::Ed25519KeyPair;
    use serde_json::json;

    fn signed(params: serde_json::Value) -> SignedIntent {
        let at = Timestamp::from_epoch_secs(1_767_225_600).unwrap();
        TransactionIntent::new(LedgerAction::JoinCircle, params, at)
            .unwrap()
            .sign(&Ed25519KeyPair::from_seed(&[7u8; 32]))
            .unwrap()
    }

    #[test]
    fn resubmission_returns_original_handle() {
        let ledger = MockLedgerAdapter::new();
        let intent = signed(json!({"member": "alice"}));
        let first = ledger.submit_transaction(&intent).unwrap();
        let second = ledger.submit_transaction(&intent).unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.entry_count(), 1);
        assert_eq!(ledger.submission_attempts(), 2);
    }

    #[test]
    fn injected_failures_are_transient() {
        let ledger = MockLedgerAdapter::new();
        ledger.fail_next_submissions(1);
        let intent = signed(json!({"member": "alice"}));
        let err = ledger.submit_transaction(&intent).unwrap_err();
        assert!(err.is_transient());
        assert!(ledger.submit_transaction(&intent).is_ok());
    }

    #[test]
    fn rejects_bad_signature() {
        let ledger = MockLedgerAdapter::new();
        let mut intent = signed(json!({"member": "alice"}));
        intent.intent.params = json!({"member": "mallory"});
        assert!(matches!(
            ledger.submit_transaction(&intent),
            Err(LedgerError::InvalidSignature(_))
        ));
        assert_eq!(ledger.entry_count(), 0);
    }

    #[test]
    fn rejection_convention() {
        let ledger = MockLedgerAdapter::new();
        let err = ledger
            .submit_transaction(&signed(json!({"reject": true})))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn confirms_after_configured_polls() {
        let ledger = MockLedgerAdapter::confirming_after(2);
        let handle = ledger
            .submit_transaction(&signed(json!({"member": "alice"})))
            .unwrap();
        assert_eq!(
            ledger.get_transaction_status(&handle).unwrap(),
            TransactionStatus::Pending
        );
        assert_eq!(
            ledger.get_transaction_status(&handle).unwrap(),
            TransactionStatus::Pending
        );
        assert_eq!(
            ledger.get_transaction_status(&handle).unwrap(),
            TransactionStatus::Confirmed
        );
    }

    #[test]
    fn unknown_handle() {
        let ledger = MockLedgerAdapter::new();
        let err = ledger
            .get_transaction_status(&TransactionHandle::new("mock-99999999"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}

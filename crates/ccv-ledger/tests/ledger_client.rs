//! End-to-end ledger client behavior against the mock and log adapters.

use std::sync::Arc;

use ccv_core::IdempotencyKey;
use ccv_crypto::Ed25519KeyPair;
use ccv_ledger::{
    AppendOnlyLogAdapter, LedgerAction, LedgerAdapter, LedgerClient, LedgerConfig, LedgerError,
    MockLedgerAdapter, TransactionStatus,
};
use serde_json::json;

fn client(adapter: Arc<dyn LedgerAdapter>) -> LedgerClient {
    LedgerClient::new(
        adapter,
        Arc::new(Ed25519KeyPair::from_seed(&[11u8; 32])),
        LedgerConfig::fast(),
    )
}

#[tokio::test]
async fn retried_submission_records_one_entry() {
    let ledger = Arc::new(MockLedgerAdapter::new());
    ledger.fail_next_submissions(2);
    let client = client(ledger.clone());

    let submission = client
        .submit(LedgerAction::CompleteRound, json!({"circle": "c1", "round": 0}))
        .await
        .unwrap();

    assert_eq!(submission.attempts, 3);
    assert_eq!(ledger.entry_count(), 1);
    assert_eq!(ledger.submission_attempts(), 3);

    // A second submission of the same action maps to the same entry.
    let again = client
        .submit(LedgerAction::CompleteRound, json!({"circle": "c1", "round": 0}))
        .await
        .unwrap();
    assert_eq!(again.handle, submission.handle);
    assert_eq!(ledger.entry_count(), 1);
}

#[tokio::test]
async fn exhausted_retries_fail_the_submission() {
    let ledger = Arc::new(MockLedgerAdapter::new());
    ledger.fail_next_submissions(10);
    let client = client(ledger.clone());

    let err = client
        .submit(LedgerAction::JoinCircle, json!({"member": "alice"}))
        .await
        .unwrap_err();
    match err {
        LedgerError::SubmissionFailed { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("expected SubmissionFailed, got {other:?}"),
    }
    assert_eq!(ledger.entry_count(), 0);
}

#[tokio::test]
async fn rejection_is_returned_without_retry() {
    let ledger = Arc::new(MockLedgerAdapter::new());
    let client = client(ledger.clone());
    let err = client
        .submit(LedgerAction::CreateCircle, json!({"reject": true}))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Rejected { .. }));
    assert_eq!(ledger.submission_attempts(), 1);
}

#[tokio::test]
async fn confirmation_is_polled() {
    let ledger = Arc::new(MockLedgerAdapter::confirming_after(3));
    let client = client(ledger);
    let (_, status) = client
        .submit_and_confirm(LedgerAction::CompleteRound, json!({"round": 1}))
        .await
        .unwrap();
    assert_eq!(status, TransactionStatus::Confirmed);
}

#[tokio::test]
async fn confirmation_times_out() {
    let ledger = Arc::new(MockLedgerAdapter::confirming_after(u32::MAX));
    let config = LedgerConfig {
        confirmation_timeout_secs: 0,
        ..LedgerConfig::fast()
    };
    let client = LedgerClient::new(
        ledger,
        Arc::new(Ed25519KeyPair::from_seed(&[11u8; 32])),
        config,
    );
    let submission = client
        .submit(LedgerAction::CompleteRound, json!({"round": 1}))
        .await
        .unwrap();
    let err = client.await_confirmation(&submission.handle).await.unwrap_err();
    assert!(matches!(err, LedgerError::ConfirmationTimeout { .. }));
}

#[tokio::test]
async fn explicit_key_overrides_derived_key() {
    let ledger = Arc::new(MockLedgerAdapter::new());
    let client = client(ledger.clone());
    let key = IdempotencyKey::new("join-alice-1").unwrap();
    let first = client
        .submit_with_key(LedgerAction::JoinCircle, json!({"member": "alice"}), key.clone())
        .await
        .unwrap();
    let second = client
        .submit_with_key(LedgerAction::JoinCircle, json!({"member": "alice", "retry": 1}), key)
        .await
        .unwrap();
    assert_eq!(first.handle, second.handle);
    assert_eq!(ledger.entry_count(), 1);

    let recorded = ledger.intent(&first.handle).unwrap();
    assert_eq!(recorded.signer, client.operator_key());
    recorded.verify().unwrap();
}

#[tokio::test]
async fn log_adapter_persists_signed_intents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.jsonl");
    let log = Arc::new(AppendOnlyLogAdapter::open(&path).unwrap());
    let client = client(log);

    let (submission, status) = client
        .submit_and_confirm(LedgerAction::RecordContribution, json!({"member": "bob", "round": 0}))
        .await
        .unwrap();
    assert_eq!(status, TransactionStatus::Confirmed);
    assert_eq!(submission.handle.as_str(), "log-00000001");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains("RECORD_CONTRIBUTION"));
}

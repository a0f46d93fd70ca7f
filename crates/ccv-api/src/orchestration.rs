//! # Ledger Orchestration
//!
//! Circle operations complete synchronously against the registry; their
//! ledger records are submitted afterwards in spawned tasks so no request
//! waits on the ledger.
//!
//! - **Settlement**: a completed round is submitted as a `COMPLETE_ROUND`
//!   intent. The handle is attached to the round, and the confirmation
//!   outcome is written back with `update_settlement_status`. A submission
//!   that exhausts its retries marks the settlement `Failed`.
//! - **Audit**: joins and contributions are recorded on the ledger as
//!   `JOIN_CIRCLE` and `RECORD_CONTRIBUTION` intents; failures are logged.
//! - **Overdue scan**: periodic report of rounds past their deadline.

use ccv_ledger::{LedgerAction, LedgerError, TransactionStatus};
use ccv_settlement::{CircleRegistry, OverdueRound, RoundSettlement};
use ccv_state::SettlementStatus;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::middleware::metrics::{
    LEDGER_SUBMISSIONS_TOTAL, OVERDUE_ROUNDS, ROUNDS_COMPLETED_TOTAL,
};
use crate::state::AppState;

fn record_submission(action: LedgerAction, outcome: &'static str) {
    metrics::counter!(
        LEDGER_SUBMISSIONS_TOTAL,
        "action" => action.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Ledger parameters of a round settlement.
pub fn settlement_params(settlement: &RoundSettlement) -> serde_json::Value {
    json!({
        "circle_id": settlement.circle_id.as_uuid(),
        "round_index": settlement.round_index,
        "recipient": settlement.recipient,
        "currency": settlement.currency,
        "pool_commitment": settlement.pool_commitment,
        "pool_total": settlement.pool_total,
        "contributions": settlement.contributions,
        "completed_at": settlement.completed_at,
    })
}

/// Submit a completed round to the ledger and record the outcome.
pub fn spawn_settlement(state: &AppState, settlement: &RoundSettlement) -> JoinHandle<()> {
    metrics::counter!(ROUNDS_COMPLETED_TOTAL).increment(1);
    let registry = state.registry.clone();
    let ledger = state.ledger.clone();
    let circle_id = settlement.circle_id;
    let round_index = settlement.round_index;
    let params = settlement_params(settlement);

    tokio::spawn(async move {
        let action = LedgerAction::CompleteRound;
        let submission = match ledger.submit(action, params).await {
            Ok(submission) => submission,
            Err(e) => {
                record_submission(action, "failed");
                tracing::error!(
                    circle_id = %circle_id,
                    round_index,
                    "settlement submission failed: {e}"
                );
                let status = SettlementStatus::Failed {
                    reason: e.to_string(),
                };
                if let Err(e) = registry.update_settlement_status(circle_id, round_index, status) {
                    tracing::error!(circle_id = %circle_id, round_index, "recording settlement failure: {e}");
                }
                return;
            }
        };
        record_submission(action, "submitted");

        if let Err(e) =
            registry.attach_settlement(circle_id, round_index, submission.handle.to_string())
        {
            tracing::error!(circle_id = %circle_id, round_index, "attaching settlement: {e}");
            return;
        }

        let status = match ledger.await_confirmation(&submission.handle).await {
            Ok(TransactionStatus::Confirmed) => SettlementStatus::Confirmed,
            Ok(TransactionStatus::Failed { reason }) => SettlementStatus::Failed { reason },
            Ok(TransactionStatus::Pending) => return,
            Err(LedgerError::ConfirmationTimeout { waited_ms, .. }) => {
                tracing::warn!(
                    circle_id = %circle_id,
                    round_index,
                    handle = %submission.handle,
                    waited_ms,
                    "settlement still pending"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(circle_id = %circle_id, round_index, "settlement status unknown: {e}");
                return;
            }
        };
        if let Err(e) = registry.update_settlement_status(circle_id, round_index, status) {
            tracing::error!(circle_id = %circle_id, round_index, "updating settlement status: {e}");
        }
    })
}

/// Record a membership or contribution action on the ledger.
pub fn spawn_audit(state: &AppState, action: LedgerAction, params: serde_json::Value) -> JoinHandle<()> {
    let ledger = state.ledger.clone();
    tokio::spawn(async move {
        match ledger.submit(action, params).await {
            Ok(submission) => {
                record_submission(action, "submitted");
                tracing::debug!(%action, handle = %submission.handle, "audit entry recorded");
            }
            Err(e) => {
                record_submission(action, "failed");
                tracing::error!(%action, "audit submission failed: {e}");
            }
        }
    })
}

/// Report rounds past their deadline with members still unpaid.
pub fn scan_overdue(registry: &CircleRegistry) -> Vec<OverdueRound> {
    let overdue = registry.overdue_rounds(registry.now());
    for round in &overdue {
        tracing::warn!(
            circle_id = %round.circle_id,
            round_index = round.round_index,
            deadline = %round.deadline,
            unpaid = round.unpaid.len(),
            "round overdue"
        );
    }
    metrics::gauge!(OVERDUE_ROUNDS).set(overdue.len() as f64);
    overdue
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccv_core::{Amount, CircleId, Currency, MemberId, Timestamp};
    use ccv_crypto::Commitment;

    #[test]
    fn settlement_params_are_canonicalizable() {
        let settlement = RoundSettlement {
            circle_id: CircleId::new(),
            round_index: 1,
            recipient: MemberId::new("bob").unwrap(),
            currency: Currency::Usdc,
            pool_commitment: Commitment::identity(),
            pool_total: Some(Amount(300)),
            contributions: 3,
            completed_at: Timestamp::from_epoch_secs(1_767_225_600).unwrap(),
            circle_completed: false,
            next_round: Some(2),
        };
        let params = settlement_params(&settlement);
        assert_eq!(params["round_index"], 1);
        assert_eq!(params["recipient"], "bob");
        assert_eq!(params["pool_total"], 300);
        ccv_core::CanonicalBytes::new(&params).unwrap();
    }
}

//! # Round Settlement Engine
//!
//! ```text
//! Open ──(last payment)──▶ AwaitingRecipientSelection ──(complete_round)──▶ Completed
//! ```
//!
//! Completion is a compare-and-transition under the circle's write lock:
//! it succeeds once per round, and a second call observes `Completed` and
//! fails with `RoundClosed`. Completing a round pays the recipient, bumps
//! the circle's round counter, and opens the next round (or completes the
//! circle).
//!
//! The ledger outcome of a completed round arrives later and is recorded
//! with [`CircleRegistry::attach_settlement`] and
//! [`CircleRegistry::update_settlement_status`].

use ccv_core::{CircleId, MemberId, Timestamp};
use ccv_state::{CircleStatus, Round, RoundPhase, RoundStateError, SettlementStatus};

use crate::error::CircleError;
use crate::registry::{pool_commitment, CircleAggregate, CircleRegistry};
use crate::view::{OverdueRound, RoundSettlement, RoundView};

fn round_not_open(agg: &CircleAggregate, round_index: u32) -> CircleError {
    CircleError::RoundNotOpen {
        circle_id: agg.id(),
        round_index,
        current_round: agg.circle.current_round,
    }
}

impl CircleRegistry {
    /// Pay the round's pool to the next recipient and advance the circle.
    ///
    /// Fails with `PaymentsOutstanding` while members still owe the round,
    /// or `PaymentOverdue` once its deadline passed; the round stays open
    /// in both cases.
    pub fn complete_round(
        &self,
        circle_id: CircleId,
        round_index: u32,
    ) -> Result<RoundSettlement, CircleError> {
        let handle = self.handle(circle_id)?;
        let now = self.now();
        let mut agg = handle.write();

        let round = agg
            .rounds
            .get(round_index as usize)
            .ok_or_else(|| round_not_open(&agg, round_index))?;
        if round.phase.is_terminal() {
            return Err(CircleError::RoundClosed {
                circle_id,
                round_index,
            });
        }
        let status = agg.circle.status;
        if status != CircleStatus::Active {
            return Err(CircleError::CircleNotActive { circle_id, status });
        }
        if round.phase == RoundPhase::Open {
            let unpaid = agg.unpaid(round);
            if round.is_overdue(now) {
                tracing::warn!(
                    circle_id = %circle_id,
                    round_index,
                    unpaid = unpaid.len(),
                    deadline = %round.deadline,
                    "round completion refused, payments overdue"
                );
                return Err(CircleError::PaymentOverdue {
                    circle_id,
                    round_index,
                    unpaid,
                    deadline: round.deadline,
                });
            }
            return Err(CircleError::PaymentsOutstanding {
                circle_id,
                round_index,
                unpaid,
            });
        }

        let recipient = self
            .policy
            .select(&agg.eligible())
            .map(|m| m.member_id.clone())
            .ok_or(CircleError::NoEligibleRecipient {
                circle_id,
                round_index,
            })?;

        let mut round: Round = round.clone();
        round
            .complete(recipient.clone(), now)
            .map_err(|e| CircleError::InvalidTransition {
                circle_id,
                reason: e.to_string(),
            })?;
        let mut membership = agg.members[&recipient].clone();
        membership
            .mark_payout(round_index)
            .map_err(|e| CircleError::internal(circle_id, e))?;
        let mut circle = agg.circle.clone();
        let circle_completed = circle
            .advance_round(now)
            .map_err(|e| CircleError::internal(circle_id, e))?;
        let next = (!circle_completed).then(|| {
            let deadline = now.saturating_add_secs(circle.terms.frequency.window_secs());
            Round::open(
                circle_id,
                circle.current_round,
                circle.terms.per_round_amount,
                now,
                deadline,
            )
        });

        let pool_commitment = pool_commitment(&agg, &round)?;
        let settlement = RoundSettlement {
            circle_id,
            round_index,
            recipient: recipient.clone(),
            currency: circle.terms.currency,
            pool_commitment,
            pool_total: round.pool_total(),
            contributions: round.contributions.len(),
            completed_at: now,
            circle_completed,
            next_round: next.as_ref().map(|r| r.index),
        };

        agg.rounds[round_index as usize] = round;
        agg.members.insert(recipient.clone(), membership);
        agg.circle = circle;
        if let Some(next) = next {
            agg.rounds.push(next);
        }

        tracing::info!(
            circle_id = %circle_id,
            round_index,
            recipient = %recipient,
            policy = self.policy.name(),
            circle_completed,
            "round completed"
        );
        Ok(settlement)
    }

    /// Phase, payment status, and recipient of one round as of `now`.
    pub fn round_state(
        &self,
        circle_id: CircleId,
        round_index: u32,
        now: Timestamp,
    ) -> Result<RoundView, CircleError> {
        let handle = self.handle(circle_id)?;
        let agg = handle.read();
        let round = agg
            .rounds
            .get(round_index as usize)
            .ok_or_else(|| round_not_open(&agg, round_index))?;

        let live = agg.circle.status == CircleStatus::Active && !round.phase.is_terminal();
        let unpaid = if live { agg.unpaid(round) } else { Vec::new() };
        let projected_recipient = if live {
            agg.projected_recipient(self.policy.as_ref())
        } else {
            None
        };
        Ok(RoundView {
            circle_id,
            round_index,
            phase: round.phase,
            required_contribution: round.required_contribution,
            paid: round.contributions.keys().cloned().collect(),
            unpaid,
            recipient: round.recipient.clone(),
            projected_recipient,
            opened_at: round.opened_at,
            deadline: round.deadline,
            overdue: live && round.is_overdue(now),
            pool_commitment: pool_commitment(&agg, round)?,
            pool_total: round.pool_total(),
            settlement: round.settlement.clone(),
        })
    }

    /// Open rounds of active circles that passed their deadline with
    /// members still unpaid, earliest deadline first.
    pub fn overdue_rounds(&self, now: Timestamp) -> Vec<OverdueRound> {
        let mut overdue: Vec<OverdueRound> = self
            .handles()
            .into_iter()
            .filter_map(|handle| {
                let agg = handle.read();
                let round = agg.open_round()?;
                if !round.is_overdue(now) {
                    return None;
                }
                let unpaid = agg.unpaid(round);
                if unpaid.is_empty() {
                    return None;
                }
                Some(OverdueRound {
                    circle_id: agg.id(),
                    round_index: round.index,
                    deadline: round.deadline,
                    unpaid,
                })
            })
            .collect();
        overdue.sort_by(|a, b| {
            a.deadline
                .cmp(&b.deadline)
                .then_with(|| a.circle_id.cmp(&b.circle_id))
        });
        overdue
    }

    /// Record the ledger handle of a completed round's settlement. The
    /// status starts as pending.
    pub fn attach_settlement(
        &self,
        circle_id: CircleId,
        round_index: u32,
        handle: String,
    ) -> Result<(), CircleError> {
        self.with_completed_round(circle_id, round_index, |round, now| {
            round.attach_settlement(handle, now)
        })
    }

    /// Record the latest ledger status of a completed round's settlement.
    pub fn update_settlement_status(
        &self,
        circle_id: CircleId,
        round_index: u32,
        status: SettlementStatus,
    ) -> Result<(), CircleError> {
        let label = match &status {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Confirmed => "confirmed",
            SettlementStatus::Failed { .. } => "failed",
        };
        self.with_completed_round(circle_id, round_index, |round, now| {
            round.update_settlement_status(status, now)
        })?;
        tracing::info!(circle_id = %circle_id, round_index, status = label, "settlement status updated");
        Ok(())
    }

    fn with_completed_round(
        &self,
        circle_id: CircleId,
        round_index: u32,
        apply: impl FnOnce(&mut Round, Timestamp) -> Result<(), RoundStateError>,
    ) -> Result<(), CircleError> {
        let handle = self.handle(circle_id)?;
        let now = self.now();
        let mut agg = handle.write();
        let current_round = agg.circle.current_round;
        let round = agg
            .rounds
            .get_mut(round_index as usize)
            .ok_or(CircleError::RoundNotOpen {
                circle_id,
                round_index,
                current_round,
            })?;
        apply(round, now).map_err(|e| CircleError::InvalidTransition {
            circle_id,
            reason: e.to_string(),
        })
    }

    /// Members owing the open round of `circle_id`, for reminders.
    pub fn unpaid_members(&self, circle_id: CircleId) -> Result<Vec<MemberId>, CircleError> {
        let handle = self.handle(circle_id)?;
        let agg = handle.read();
        let unpaid = agg.open_round().map(|r| agg.unpaid(r)).unwrap_or_default();
        Ok(unpaid)
    }
}

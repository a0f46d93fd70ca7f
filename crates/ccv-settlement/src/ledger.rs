//! # Membership Ledger
//!
//! Records contribution commitments per round and keeps the escrow tally.
//!
//! `record_payment` checks preconditions under the circle's read lock,
//! verifies the range proof with no lock held, then re-checks and applies
//! under the write lock. Two payments racing for the same member both pass
//! the first check, but only the first to reach the write lock is applied;
//! the other fails with `DuplicatePayment`.
//!
//! Proofs are verified against the payment slot (circle, round, member) they
//! are submitted for, and a commitment already recorded anywhere in the
//! circle is refused.

use ccv_core::{Amount, CircleId, MemberId};
use ccv_crypto::{verify, Commitment, ContributionCommitment, ContributionOpening, PaymentContext};
use ccv_state::{CircleStatus, ContributionRecord, RoundPhase, RoundStateError};

use crate::error::CircleError;
use crate::registry::{CircleAggregate, CircleRegistry};
use crate::view::PaymentReceipt;

impl CircleAggregate {
    /// Preconditions for a payment, in reporting order. Returns the
    /// round's required contribution.
    fn check_payment(&self, round_index: u32, member_id: &MemberId) -> Result<Amount, CircleError> {
        let circle_id = self.id();
        let status = self.circle.status;
        if status != CircleStatus::Active {
            return Err(CircleError::CircleNotActive { circle_id, status });
        }
        let current_round = self.circle.current_round;
        if round_index > current_round {
            return Err(CircleError::RoundNotOpen {
                circle_id,
                round_index,
                current_round,
            });
        }
        if !self
            .members
            .get(member_id)
            .is_some_and(|m| m.owes_round(round_index))
        {
            return Err(CircleError::NotAMember {
                circle_id,
                member_id: member_id.clone(),
            });
        }
        let round = self
            .rounds
            .get(round_index as usize)
            .ok_or(CircleError::RoundNotOpen {
                circle_id,
                round_index,
                current_round,
            })?;
        if round.has_paid(member_id) {
            return Err(CircleError::DuplicatePayment {
                circle_id,
                round_index,
                member_id: member_id.clone(),
            });
        }
        if round.phase != RoundPhase::Open || round_index < current_round {
            return Err(CircleError::RoundClosed {
                circle_id,
                round_index,
            });
        }
        Ok(round.required_contribution)
    }

    /// Refuses a commitment already recorded in any round of the circle.
    fn check_fresh_commitment(
        &self,
        round_index: u32,
        member_id: &MemberId,
        commitment: &Commitment,
    ) -> Result<(), CircleError> {
        let seen = self
            .rounds
            .iter()
            .flat_map(|r| r.contributions.values())
            .any(|record| &record.commitment == commitment);
        if seen {
            return Err(CircleError::InvalidCommitment {
                circle_id: self.id(),
                round_index,
                member_id: member_id.clone(),
            });
        }
        Ok(())
    }
}

impl CircleRegistry {
    /// Record a member's contribution to a round.
    ///
    /// The range proof must show the committed amount meets the round's
    /// required contribution and must have been built for this circle, round
    /// and member. A commitment already recorded in the circle is refused.
    /// When the last member owing the round pays, the round moves to
    /// recipient selection. Nothing changes on error.
    pub fn record_payment(
        &self,
        circle_id: CircleId,
        round_index: u32,
        member_id: &MemberId,
        contribution: ContributionCommitment,
    ) -> Result<PaymentReceipt, CircleError> {
        let handle = self.handle(circle_id)?;
        let required = {
            let agg = handle.read();
            let required = agg.check_payment(round_index, member_id)?;
            agg.check_fresh_commitment(round_index, member_id, &contribution.commitment)?;
            required
        };

        let slot = PaymentContext::new(circle_id, round_index, member_id.clone());
        if !verify(&contribution.commitment, &contribution.proof, required, &slot) {
            tracing::warn!(
                circle_id = %circle_id,
                round_index,
                member_id = %member_id,
                "contribution proof rejected"
            );
            return Err(CircleError::InvalidCommitment {
                circle_id,
                round_index,
                member_id: member_id.clone(),
            });
        }

        let now = self.now();
        let mut agg = handle.write();
        // The first check ran under a lock since released.
        agg.check_payment(round_index, member_id)?;
        agg.check_fresh_commitment(round_index, member_id, &contribution.commitment)?;

        let index = round_index as usize;
        let record = ContributionRecord::new(
            circle_id,
            round_index,
            member_id.clone(),
            contribution.commitment,
            contribution.proof,
            now,
        )
        .map_err(|e| CircleError::internal(circle_id, e))?;
        let digest = record.digest.to_string();

        let mut round = agg.rounds[index].clone();
        round
            .record_contribution(record)
            .map_err(|e| CircleError::internal(circle_id, e))?;
        let mut membership = agg.members[member_id].clone();
        membership
            .record_contribution(&contribution.commitment, required)
            .map_err(|e| CircleError::internal(circle_id, e))?;

        agg.rounds[index] = round;
        agg.members.insert(member_id.clone(), membership);
        agg.close_if_fully_paid(now, "all members paid")?;

        let round = &agg.rounds[index];
        let remaining = agg.unpaid(round);
        tracing::info!(
            circle_id = %circle_id,
            round_index,
            member_id = %member_id,
            remaining = remaining.len(),
            "contribution recorded"
        );
        Ok(PaymentReceipt {
            circle_id,
            round_index,
            member_id: member_id.clone(),
            digest,
            recorded_at: now,
            phase: round.phase,
            remaining,
        })
    }

    /// Fold a member's opening into the round's escrow tally.
    ///
    /// The opening must match the member's recorded commitment for the
    /// round. Only the running sums are kept. Once every contribution's
    /// opening is in, the round's pool total becomes available.
    pub fn deposit_opening(
        &self,
        circle_id: CircleId,
        round_index: u32,
        member_id: &MemberId,
        opening: &ContributionOpening,
    ) -> Result<(), CircleError> {
        let handle = self.handle(circle_id)?;
        let mut agg = handle.write();

        if !agg.members.contains_key(member_id) {
            return Err(CircleError::NotAMember {
                circle_id,
                member_id: member_id.clone(),
            });
        }
        let current_round = agg.circle.current_round;
        let round = agg
            .rounds
            .get_mut(round_index as usize)
            .ok_or(CircleError::RoundNotOpen {
                circle_id,
                round_index,
                current_round,
            })?;
        round
            .deposit_opening(member_id, opening)
            .map_err(|e| match e {
                RoundStateError::NoCommitment { .. } => CircleError::NoCommitment {
                    circle_id,
                    round_index,
                    member_id: member_id.clone(),
                },
                RoundStateError::AlreadyDeposited { .. } => CircleError::DuplicatePayment {
                    circle_id,
                    round_index,
                    member_id: member_id.clone(),
                },
                RoundStateError::OpeningMismatch { .. } => CircleError::OpeningMismatch {
                    circle_id,
                    round_index,
                    member_id: member_id.clone(),
                },
                other => CircleError::internal(circle_id, other),
            })?;
        tracing::debug!(
            circle_id = %circle_id,
            round_index,
            deposited = round.deposited.len(),
            contributions = round.contributions.len(),
            "opening deposited with escrow"
        );
        Ok(())
    }
}

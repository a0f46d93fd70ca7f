//! # Membership
//!
//! One record per (circle, member). The payout marker is set at most once
//! for the lifetime of the circle: each member receives the pool exactly
//! once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ccv_core::{Amount, CircleId, MemberId, Timestamp};
use ccv_crypto::{Commitment, CommitmentError};

/// Errors from membership updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// The member already received the pool in an earlier round.
    #[error("member {member_id} already received a payout in round {round}")]
    PayoutAlreadyReceived {
        /// The member.
        member_id: MemberId,
        /// Round of the earlier payout.
        round: u32,
    },

    /// The member has been excluded.
    #[error("member {member_id} is inactive")]
    Inactive {
        /// The member.
        member_id: MemberId,
    },

    /// The running commitment could not be updated.
    #[error("commitment error: {0}")]
    Commitment(#[from] CommitmentError),
}

/// A member's standing in one circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Circle the membership belongs to.
    pub circle_id: CircleId,
    /// The member.
    pub member_id: MemberId,
    /// When the member joined.
    pub joined_at: Timestamp,
    /// Position in join order, unique within the circle.
    pub join_seq: u64,
    /// First round the member owes a contribution for. Members who join
    /// before activation start at round 0.
    pub first_round: u32,
    /// Whether the member is still active.
    pub active: bool,
    /// Number of rounds the member has paid into.
    pub rounds_participated: u32,
    /// Homomorphic sum of every contribution commitment the member made.
    pub cumulative_commitment: Commitment,
    /// Publicly known lower bound on what the member contributed
    /// (`rounds_participated × per_round_amount`).
    pub minimum_contributed: Amount,
    /// Round in which the member received the pool, if any.
    pub payout_round: Option<u32>,
    /// Why the member was excluded, if they were.
    pub exclusion_reason: Option<String>,
}

impl Membership {
    /// Create an active membership.
    pub fn new(
        circle_id: CircleId,
        member_id: MemberId,
        joined_at: Timestamp,
        join_seq: u64,
        first_round: u32,
    ) -> Self {
        Self {
            circle_id,
            member_id,
            joined_at,
            join_seq,
            first_round,
            active: true,
            rounds_participated: 0,
            cumulative_commitment: Commitment::identity(),
            minimum_contributed: Amount::ZERO,
            payout_round: None,
            exclusion_reason: None,
        }
    }

    /// Whether the member has received the pool.
    pub fn has_received_payout(&self) -> bool {
        self.payout_round.is_some()
    }

    /// Whether the member owes a contribution for `round`.
    pub fn owes_round(&self, round: u32) -> bool {
        self.active && self.first_round <= round
    }

    /// Whether the member can still be selected as a recipient.
    pub fn is_eligible_recipient(&self) -> bool {
        self.active && self.payout_round.is_none()
    }

    /// Fold a verified contribution into the running totals.
    pub fn record_contribution(
        &mut self,
        commitment: &Commitment,
        required: Amount,
    ) -> Result<(), MembershipError> {
        if !self.active {
            return Err(MembershipError::Inactive {
                member_id: self.member_id.clone(),
            });
        }
        let cumulative = self.cumulative_commitment.add(commitment)?;
        let minimum = self
            .minimum_contributed
            .checked_add(required)
            .map_err(|_| CommitmentError::Overflow)?;
        self.cumulative_commitment = cumulative;
        self.minimum_contributed = minimum;
        self.rounds_participated += 1;
        Ok(())
    }

    /// Mark the payout for `round`. Fails if a payout was already marked.
    pub fn mark_payout(&mut self, round: u32) -> Result<(), MembershipError> {
        if let Some(earlier) = self.payout_round {
            return Err(MembershipError::PayoutAlreadyReceived {
                member_id: self.member_id.clone(),
                round: earlier,
            });
        }
        if !self.active {
            return Err(MembershipError::Inactive {
                member_id: self.member_id.clone(),
            });
        }
        self.payout_round = Some(round);
        Ok(())
    }

    /// Mark the member inactive.
    pub fn deactivate(&mut self, reason: &str) -> Result<(), MembershipError> {
        if !self.active {
            return Err(MembershipError::Inactive {
                member_id: self.member_id.clone(),
            });
        }
        self.active = false;
        self.exclusion_reason = Some(reason.to_string());
        Ok(())
    }
}

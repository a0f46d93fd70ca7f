//! # Round Settlement State Machine
//!
//! ```text
//! Open ──▶ AwaitingRecipientSelection ──▶ Completed
//!   │                  │
//!   └──────────────────┴──▶ Voided
//! ```
//!
//! - `Open`: contributions are accepted until every active member has paid.
//! - `AwaitingRecipientSelection`: entered as soon as the last active member
//!   pays; no further contributions.
//! - `Completed`: the recipient is fixed. The ledger settlement outcome is
//!   attached afterwards, asynchronously.
//! - `Voided`: the circle closed before the round could pay out. Any
//!   contributions it holds are owed back to their members.
//!
//! The round keeps every contribution commitment for audit. Openings
//! deposited with the escrow are folded into a running tally and never
//! stored individually.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ccv_core::{
    sha256_digest, Amount, CanonicalBytes, CanonicalizationError, CircleId, ContentDigest,
    MemberId, Timestamp,
};
use ccv_crypto::{
    aggregate, AggregateOpening, Commitment, CommitmentError, ContributionOpening, RangeProof,
};

// ─── Round Phase ─────────────────────────────────────────────────────

/// Phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Accepting contributions.
    Open,
    /// Every active member has paid; waiting for completion.
    AwaitingRecipientSelection,
    /// Recipient fixed, round closed.
    Completed,
    /// Closed without a payout; recorded contributions are to be refunded.
    Voided,
}

impl RoundPhase {
    /// Whether the round accepts no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Voided)
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "OPEN",
            Self::AwaitingRecipientSelection => "AWAITING_RECIPIENT_SELECTION",
            Self::Completed => "COMPLETED",
            Self::Voided => "VOIDED",
        };
        f.write_str(s)
    }
}

/// Outcome of the ledger submission for a completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SettlementStatus {
    /// Submitted, not yet confirmed.
    Pending,
    /// Confirmed by the ledger.
    Confirmed,
    /// Rejected by the ledger, or submission gave up.
    Failed {
        /// Why the settlement failed.
        reason: String,
    },
}

/// Ledger settlement attached to a completed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Ledger transaction handle, once submission succeeded.
    pub handle: Option<String>,
    /// Latest known status.
    pub status: SettlementStatus,
    /// When the status was last updated.
    pub updated_at: Timestamp,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from round transitions and escrow updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundStateError {
    /// Attempted transition is not valid from the current phase.
    #[error("invalid round transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase.
        from: RoundPhase,
        /// Attempted target phase.
        to: RoundPhase,
    },

    /// The member already contributed to this round.
    #[error("member {member_id} already paid round {round}")]
    AlreadyPaid {
        /// The member.
        member_id: MemberId,
        /// Round index.
        round: u32,
    },

    /// The member has no contribution in this round.
    #[error("member {member_id} has no contribution in round {round}")]
    NoCommitment {
        /// The member.
        member_id: MemberId,
        /// Round index.
        round: u32,
    },

    /// The member's opening was already deposited.
    #[error("opening for member {member_id} already deposited in round {round}")]
    AlreadyDeposited {
        /// The member.
        member_id: MemberId,
        /// Round index.
        round: u32,
    },

    /// The opening does not match the recorded commitment.
    #[error("opening does not match the commitment of member {member_id} in round {round}")]
    OpeningMismatch {
        /// The member.
        member_id: MemberId,
        /// Round index.
        round: u32,
    },

    /// Escrow tally arithmetic failed.
    #[error("escrow tally: {0}")]
    Tally(#[from] CommitmentError),
}

// ─── Contribution Record ─────────────────────────────────────────────

/// A contribution commitment as retained for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    /// Circle.
    pub circle_id: CircleId,
    /// Round index.
    pub round_index: u32,
    /// Contributing member.
    pub member_id: MemberId,
    /// Pedersen commitment to the amount.
    pub commitment: Commitment,
    /// Proof that the amount meets the round's requirement.
    pub proof: RangeProof,
    /// When the contribution was recorded.
    pub recorded_at: Timestamp,
    /// SHA-256 over the canonical form of the fields above.
    pub digest: ContentDigest,
}

#[derive(Serialize)]
struct ContributionDigestInput<'a> {
    circle_id: &'a CircleId,
    round_index: u32,
    member_id: &'a MemberId,
    commitment: &'a Commitment,
    proof: &'a RangeProof,
    recorded_at: &'a Timestamp,
}

impl ContributionRecord {
    /// Build a record and compute its audit digest.
    pub fn new(
        circle_id: CircleId,
        round_index: u32,
        member_id: MemberId,
        commitment: Commitment,
        proof: RangeProof,
        recorded_at: Timestamp,
    ) -> Result<Self, CanonicalizationError> {
        let canonical = CanonicalBytes::new(&ContributionDigestInput {
            circle_id: &circle_id,
            round_index,
            member_id: &member_id,
            commitment: &commitment,
            proof: &proof,
            recorded_at: &recorded_at,
        })?;
        let digest = sha256_digest(&canonical);
        Ok(Self {
            circle_id,
            round_index,
            member_id,
            commitment,
            proof,
            recorded_at,
            digest,
        })
    }
}

/// Record of a round phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTransitionRecord {
    /// Phase before the transition.
    pub from_phase: RoundPhase,
    /// Phase after the transition.
    pub to_phase: RoundPhase,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Reason for the transition.
    pub reason: String,
}

// ─── Round ───────────────────────────────────────────────────────────

/// One round of a circle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Circle.
    pub circle_id: CircleId,
    /// Round index (0-based).
    pub index: u32,
    /// Contribution owed by each active member.
    pub required_contribution: Amount,
    /// Current phase.
    pub phase: RoundPhase,
    /// Contributions keyed by member; presence means "paid".
    pub contributions: BTreeMap<MemberId, ContributionRecord>,
    /// Recipient, once the round completes.
    pub recipient: Option<MemberId>,
    /// When the round opened.
    pub opened_at: Timestamp,
    /// Payment deadline.
    pub deadline: Timestamp,
    /// When the round completed.
    pub completed_at: Option<Timestamp>,
    /// Members whose openings the escrow has tallied.
    pub deposited: BTreeSet<MemberId>,
    /// Ledger settlement outcome.
    pub settlement: Option<SettlementRecord>,
    /// Ordered log of phase transitions.
    pub transitions: Vec<RoundTransitionRecord>,
    #[serde(skip)]
    tally: AggregateOpening,
}

impl Round {
    /// Open a round.
    pub fn open(
        circle_id: CircleId,
        index: u32,
        required_contribution: Amount,
        opened_at: Timestamp,
        deadline: Timestamp,
    ) -> Self {
        Self {
            circle_id,
            index,
            required_contribution,
            phase: RoundPhase::Open,
            contributions: BTreeMap::new(),
            recipient: None,
            opened_at,
            deadline,
            completed_at: None,
            deposited: BTreeSet::new(),
            settlement: None,
            transitions: Vec::new(),
            tally: AggregateOpening::default(),
        }
    }

    /// Whether `member` has contributed to this round.
    pub fn has_paid(&self, member: &MemberId) -> bool {
        self.contributions.contains_key(member)
    }

    /// Members from `active` who have not contributed, in input order.
    pub fn unpaid<'a>(&self, active: impl IntoIterator<Item = &'a MemberId>) -> Vec<MemberId> {
        active
            .into_iter()
            .filter(|m| !self.has_paid(m))
            .cloned()
            .collect()
    }

    /// Whether the round is open and past its deadline.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.phase == RoundPhase::Open && now > self.deadline
    }

    /// Append a verified contribution.
    pub fn record_contribution(&mut self, record: ContributionRecord) -> Result<(), RoundStateError> {
        self.require_phase(RoundPhase::Open, RoundPhase::Open)?;
        if self.has_paid(&record.member_id) {
            return Err(RoundStateError::AlreadyPaid {
                member_id: record.member_id,
                round: self.index,
            });
        }
        self.contributions.insert(record.member_id.clone(), record);
        Ok(())
    }

    /// OPEN → AWAITING_RECIPIENT_SELECTION.
    pub fn close_payments(&mut self, at: Timestamp, reason: &str) -> Result<(), RoundStateError> {
        self.require_phase(RoundPhase::Open, RoundPhase::AwaitingRecipientSelection)?;
        self.do_transition(RoundPhase::AwaitingRecipientSelection, at, reason);
        Ok(())
    }

    /// AWAITING_RECIPIENT_SELECTION → COMPLETED.
    pub fn complete(&mut self, recipient: MemberId, at: Timestamp) -> Result<(), RoundStateError> {
        self.require_phase(RoundPhase::AwaitingRecipientSelection, RoundPhase::Completed)?;
        let reason = format!("pool paid to {recipient}");
        self.recipient = Some(recipient);
        self.completed_at = Some(at);
        self.do_transition(RoundPhase::Completed, at, &reason);
        Ok(())
    }

    /// OPEN or AWAITING_RECIPIENT_SELECTION → VOIDED. Returns the members
    /// whose contributions are owed back.
    pub fn void(
        &mut self,
        at: Timestamp,
        reason: &str,
    ) -> Result<Vec<MemberId>, RoundStateError> {
        if self.phase.is_terminal() {
            return Err(RoundStateError::InvalidTransition {
                from: self.phase,
                to: RoundPhase::Voided,
            });
        }
        self.do_transition(RoundPhase::Voided, at, reason);
        Ok(self.contributions.keys().cloned().collect())
    }

    /// Fold a member's opening into the escrow tally after checking it
    /// matches their recorded commitment. The opening itself is not kept.
    pub fn deposit_opening(
        &mut self,
        member: &MemberId,
        opening: &ContributionOpening,
    ) -> Result<(), RoundStateError> {
        let record = self
            .contributions
            .get(member)
            .ok_or_else(|| RoundStateError::NoCommitment {
                member_id: member.clone(),
                round: self.index,
            })?;
        if self.deposited.contains(member) {
            return Err(RoundStateError::AlreadyDeposited {
                member_id: member.clone(),
                round: self.index,
            });
        }
        if !opening.opens(&record.commitment) {
            return Err(RoundStateError::OpeningMismatch {
                member_id: member.clone(),
                round: self.index,
            });
        }
        let mut tally = self.tally.clone();
        tally.absorb(opening)?;
        self.tally = tally;
        self.deposited.insert(member.clone());
        Ok(())
    }

    /// Homomorphic sum of every contribution in the round.
    pub fn pool_commitment(&self) -> Result<Commitment, CommitmentError> {
        Commitment::sum(self.contributions.values().map(|r| &r.commitment))
    }

    /// Pool total, once the escrow holds an opening for every contribution.
    pub fn pool_total(&self) -> Option<Amount> {
        if self.contributions.is_empty() || self.deposited.len() != self.contributions.len() {
            return None;
        }
        aggregate(self.contributions.values().map(|r| &r.commitment), &self.tally).ok()
    }

    /// Record the ledger handle for this round's settlement.
    pub fn attach_settlement(&mut self, handle: String, at: Timestamp) -> Result<(), RoundStateError> {
        self.require_phase(RoundPhase::Completed, RoundPhase::Completed)?;
        self.settlement = Some(SettlementRecord {
            handle: Some(handle),
            status: SettlementStatus::Pending,
            updated_at: at,
        });
        Ok(())
    }

    /// Record the latest ledger status for this round's settlement.
    pub fn update_settlement_status(
        &mut self,
        status: SettlementStatus,
        at: Timestamp,
    ) -> Result<(), RoundStateError> {
        self.require_phase(RoundPhase::Completed, RoundPhase::Completed)?;
        let handle = self.settlement.as_ref().and_then(|s| s.handle.clone());
        self.settlement = Some(SettlementRecord {
            handle,
            status,
            updated_at: at,
        });
        Ok(())
    }

    fn require_phase(&self, expected: RoundPhase, target: RoundPhase) -> Result<(), RoundStateError> {
        if self.phase != expected {
            return Err(RoundStateError::InvalidTransition {
                from: self.phase,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: RoundPhase, at: Timestamp, reason: &str) {
        self.transitions.push(RoundTransitionRecord {
            from_phase: self.phase,
            to_phase: to,
            timestamp: at,
            reason: reason.to_string(),
        });
        self.phase = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

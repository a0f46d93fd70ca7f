//! # Circle Errors
//!
//! Every registry, ledger, and engine operation fails with a [`CircleError`].
//! Variants carry the circle and, where it applies, the round index and
//! member, so callers can report precisely what was rejected. All
//! precondition checks run before any mutation: an `Err` always means the
//! registry is unchanged.

use ccv_core::{CircleId, MemberId, Timestamp};
use ccv_state::CircleStatus;
use thiserror::Error;

/// How a caller should react to a [`CircleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself is malformed or names something that does not exist.
    Input,
    /// The request is well-formed but the circle is not in a state that allows it.
    Precondition,
    /// The request raced with, or repeats, an operation that already happened.
    StaleState,
    /// Retrying later can succeed once other members act.
    Recoverable,
    /// An invariant broke inside the engine.
    Internal,
}

/// Errors from circle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CircleError {
    #[error("invalid circle parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("{circle_id} not found")]
    NotFound { circle_id: CircleId },

    #[error("{circle_id} is full ({capacity} members)")]
    CircleFull { circle_id: CircleId, capacity: u32 },

    #[error("member {member_id} already joined {circle_id}")]
    AlreadyJoined {
        circle_id: CircleId,
        member_id: MemberId,
    },

    #[error("{circle_id} is closed ({status})")]
    CircleClosed {
        circle_id: CircleId,
        status: CircleStatus,
    },

    #[error("{circle_id} is not active ({status})")]
    CircleNotActive {
        circle_id: CircleId,
        status: CircleStatus,
    },

    #[error("{circle_id} has {members} active members, {required} required")]
    InsufficientMembers {
        circle_id: CircleId,
        members: u32,
        required: u32,
    },

    #[error("{member_id} is not an active member of {circle_id}")]
    NotAMember {
        circle_id: CircleId,
        member_id: MemberId,
    },

    #[error("member {member_id} already paid round {round_index} of {circle_id}")]
    DuplicatePayment {
        circle_id: CircleId,
        round_index: u32,
        member_id: MemberId,
    },

    #[error("round {round_index} of {circle_id} is closed")]
    RoundClosed { circle_id: CircleId, round_index: u32 },

    #[error("round {round_index} of {circle_id} is not open (current round {current_round})")]
    RoundNotOpen {
        circle_id: CircleId,
        round_index: u32,
        current_round: u32,
    },

    #[error("round {round_index} of {circle_id} is waiting on {} members", unpaid.len())]
    PaymentsOutstanding {
        circle_id: CircleId,
        round_index: u32,
        unpaid: Vec<MemberId>,
    },

    #[error(
        "round {round_index} of {circle_id} passed its deadline {deadline} with {} members unpaid",
        unpaid.len()
    )]
    PaymentOverdue {
        circle_id: CircleId,
        round_index: u32,
        unpaid: Vec<MemberId>,
        deadline: Timestamp,
    },

    #[error("contribution from {member_id} to round {round_index} of {circle_id} failed verification")]
    InvalidCommitment {
        circle_id: CircleId,
        round_index: u32,
        member_id: MemberId,
    },

    #[error("member {member_id} has no contribution in round {round_index} of {circle_id}")]
    NoCommitment {
        circle_id: CircleId,
        round_index: u32,
        member_id: MemberId,
    },

    #[error("opening from {member_id} does not match its commitment in round {round_index} of {circle_id}")]
    OpeningMismatch {
        circle_id: CircleId,
        round_index: u32,
        member_id: MemberId,
    },

    #[error("invalid transition for {circle_id}: {reason}")]
    InvalidTransition { circle_id: CircleId, reason: String },

    #[error("no eligible recipient for round {round_index} of {circle_id}")]
    NoEligibleRecipient { circle_id: CircleId, round_index: u32 },

    #[error("internal error in {circle_id}: {reason}")]
    Internal { circle_id: CircleId, reason: String },
}

impl CircleError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameters { .. }
            | Self::NotFound { .. }
            | Self::InvalidCommitment { .. }
            | Self::OpeningMismatch { .. } => ErrorKind::Input,
            Self::CircleFull { .. }
            | Self::AlreadyJoined { .. }
            | Self::CircleClosed { .. }
            | Self::CircleNotActive { .. }
            | Self::InsufficientMembers { .. }
            | Self::NotAMember { .. }
            | Self::RoundNotOpen { .. }
            | Self::NoCommitment { .. }
            | Self::InvalidTransition { .. }
            | Self::NoEligibleRecipient { .. } => ErrorKind::Precondition,
            Self::DuplicatePayment { .. } | Self::RoundClosed { .. } => ErrorKind::StaleState,
            Self::PaymentsOutstanding { .. } | Self::PaymentOverdue { .. } => {
                ErrorKind::Recoverable
            }
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code, e.g. `DUPLICATE_PAYMENT`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameters { .. } => "INVALID_PARAMETERS",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::CircleFull { .. } => "CIRCLE_FULL",
            Self::AlreadyJoined { .. } => "ALREADY_JOINED",
            Self::CircleClosed { .. } => "CIRCLE_CLOSED",
            Self::CircleNotActive { .. } => "CIRCLE_NOT_ACTIVE",
            Self::InsufficientMembers { .. } => "INSUFFICIENT_MEMBERS",
            Self::NotAMember { .. } => "NOT_A_MEMBER",
            Self::DuplicatePayment { .. } => "DUPLICATE_PAYMENT",
            Self::RoundClosed { .. } => "ROUND_CLOSED",
            Self::RoundNotOpen { .. } => "ROUND_NOT_OPEN",
            Self::PaymentsOutstanding { .. } => "PAYMENTS_OUTSTANDING",
            Self::PaymentOverdue { .. } => "PAYMENT_OVERDUE",
            Self::InvalidCommitment { .. } => "INVALID_COMMITMENT",
            Self::NoCommitment { .. } => "NO_COMMITMENT",
            Self::OpeningMismatch { .. } => "OPENING_MISMATCH",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NoEligibleRecipient { .. } => "NO_ELIGIBLE_RECIPIENT",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    /// The circle the error concerns, if any.
    pub fn circle_id(&self) -> Option<CircleId> {
        match self {
            Self::InvalidParameters { .. } => None,
            Self::NotFound { circle_id }
            | Self::CircleFull { circle_id, .. }
            | Self::AlreadyJoined { circle_id, .. }
            | Self::CircleClosed { circle_id, .. }
            | Self::CircleNotActive { circle_id, .. }
            | Self::InsufficientMembers { circle_id, .. }
            | Self::NotAMember { circle_id, .. }
            | Self::DuplicatePayment { circle_id, .. }
            | Self::RoundClosed { circle_id, .. }
            | Self::RoundNotOpen { circle_id, .. }
            | Self::PaymentsOutstanding { circle_id, .. }
            | Self::PaymentOverdue { circle_id, .. }
            | Self::InvalidCommitment { circle_id, .. }
            | Self::NoCommitment { circle_id, .. }
            | Self::OpeningMismatch { circle_id, .. }
            | Self::InvalidTransition { circle_id, .. }
            | Self::NoEligibleRecipient { circle_id, .. }
            | Self::Internal { circle_id, .. } => Some(*circle_id),
        }
    }

    /// The round the error concerns, if any.
    pub fn round_index(&self) -> Option<u32> {
        match self {
            Self::DuplicatePayment { round_index, .. }
            | Self::RoundClosed { round_index, .. }
            | Self::RoundNotOpen { round_index, .. }
            | Self::PaymentsOutstanding { round_index, .. }
            | Self::PaymentOverdue { round_index, .. }
            | Self::InvalidCommitment { round_index, .. }
            | Self::NoCommitment { round_index, .. }
            | Self::OpeningMismatch { round_index, .. }
            | Self::NoEligibleRecipient { round_index, .. } => Some(*round_index),
            _ => None,
        }
    }

    /// The member the error concerns, if any.
    pub fn member_id(&self) -> Option<&MemberId> {
        match self {
            Self::AlreadyJoined { member_id, .. }
            | Self::NotAMember { member_id, .. }
            | Self::DuplicatePayment { member_id, .. }
            | Self::InvalidCommitment { member_id, .. }
            | Self::NoCommitment { member_id, .. }
            | Self::OpeningMismatch { member_id, .. } => Some(member_id),
            _ => None,
        }
    }

    /// Members still owing a contribution, for recoverable errors.
    pub fn unpaid(&self) -> Option<&[MemberId]> {
        match self {
            Self::PaymentsOutstanding { unpaid, .. } | Self::PaymentOverdue { unpaid, .. } => {
                Some(unpaid)
            }
            _ => None,
        }
    }

    pub(crate) fn internal(circle_id: CircleId, err: impl std::fmt::Display) -> Self {
        Self::Internal {
            circle_id,
            reason: err.to_string(),
        }
    }
}

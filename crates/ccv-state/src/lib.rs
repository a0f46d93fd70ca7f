//! # ccv-state: Lending Circle State Machines
//!
//! Runtime-checked state machines for the three records the settlement
//! engine mutates. Each transition validates the current state, records a
//! transition entry, and never leaves the record half-updated on error.
//!
//! - **Circle** (`circle.rs`): `Forming → Active → Completed`, with
//!   `Cancelled` reachable from `Forming` and `Active`. Tracks the round
//!   counter, which only moves forward and never passes `total_rounds`.
//!
//! - **Round** (`round.rs`): `Open → AwaitingRecipientSelection → Completed`.
//!   Holds the contribution commitments paid into the round, the escrow
//!   tally of deposited openings, and the ledger settlement outcome.
//!
//! - **Membership** (`membership.rs`): join order, active flag, cumulative
//!   contribution commitment, and the at-most-once payout marker.
//!
//! Timestamps are always passed in by the caller; nothing here reads the
//! system clock.

pub mod circle;
pub mod membership;
pub mod round;

pub use circle::{Circle, CircleStateError, CircleStatus, CircleTerms, CircleTransitionRecord, PaymentFrequency};
pub use membership::{Membership, MembershipError};
pub use round::{
    ContributionRecord, Round, RoundPhase, RoundStateError, RoundTransitionRecord,
    SettlementRecord, SettlementStatus,
};

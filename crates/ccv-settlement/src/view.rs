//! Request parameters and read-side views.
//!
//! Views are cloned out from under a circle's read lock, so each one is a
//! consistent snapshot of a single circle at a single instant.

use serde::{Deserialize, Serialize};

use ccv_core::{Amount, CircleId, Currency, MemberId, Timestamp};
use ccv_crypto::Commitment;
use ccv_state::{
    Circle, CircleStatus, Membership, PaymentFrequency, Round, RoundPhase, SettlementRecord,
};

/// Parameters for creating a circle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCircleParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Creator; not enrolled as a member automatically.
    pub creator: MemberId,
    pub currency: Currency,
    pub frequency: PaymentFrequency,
    /// Maximum number of active members.
    pub capacity: u32,
    /// Contribution each active member owes per round, in minor units.
    pub per_round_amount: Amount,
    pub total_rounds: u32,
    /// Requested start. The first deadline is one payment window after
    /// this or after activation, whichever is later.
    pub start_time: Timestamp,
}

/// Which circles to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircleFilter {
    /// Every circle.
    All,
    /// Circles the member joined (including ones they were excluded from).
    Joined(MemberId),
    /// Forming circles the member has not joined.
    Available(MemberId),
}

/// Result of a successful join.
#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub membership: Membership,
    /// Circle status after the join.
    pub status: CircleStatus,
    /// Whether this join filled the circle and activated it.
    pub activated: bool,
}

/// Pool of one round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundPool {
    pub round_index: u32,
    /// Homomorphic sum of every contribution to the round.
    pub commitment: Commitment,
    /// Revealed total, once the escrow holds every opening.
    pub total: Option<Amount>,
    pub contributions: usize,
}

/// Consistent snapshot of a circle.
#[derive(Debug, Clone, Serialize)]
pub struct CircleSnapshot {
    pub circle: Circle,
    /// Members in join order.
    pub members: Vec<Membership>,
    pub rounds: Vec<Round>,
    /// Index of the round accepting or awaiting settlement, if the circle is active.
    pub open_round: Option<u32>,
    /// Who the recipient policy would pick for the open round right now.
    pub next_recipient: Option<MemberId>,
    pub pools: Vec<RoundPool>,
}

/// One row in a circle listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircleSummary {
    pub id: CircleId,
    pub name: String,
    pub description: String,
    pub currency: Currency,
    pub frequency: PaymentFrequency,
    pub per_round_amount: Amount,
    pub capacity: u32,
    /// Active members.
    pub member_count: u32,
    pub current_round: u32,
    pub total_rounds: u32,
    pub status: CircleStatus,
    pub start_time: Timestamp,
    /// Deadline of the open round, while the circle is active.
    pub next_payment_due: Option<Timestamp>,
    pub next_recipient: Option<MemberId>,
}

/// A member's standing in one circle.
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub membership: Membership,
    pub circle_status: CircleStatus,
    /// Whether the member owes a contribution to the open round.
    pub owes_current_round: bool,
    /// Whether the member already paid the open round.
    pub paid_current_round: bool,
    /// Whether the member is the projected recipient of the open round.
    pub is_next_recipient: bool,
}

/// One circle on a member's dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    pub circle: CircleSummary,
    pub active_member: bool,
    pub paid_current_round: bool,
    pub is_next_recipient: bool,
    pub payout_round: Option<u32>,
}

/// Aggregate statistics for one member across circles.
#[derive(Debug, Clone, Serialize)]
pub struct MemberDashboard {
    pub member_id: MemberId,
    pub circles_joined: u32,
    pub active_circles: u32,
    pub completed_circles: u32,
    pub payouts_received: u32,
    /// Rounds paid into across all circles.
    pub rounds_participated: u32,
    pub circles: Vec<DashboardEntry>,
}

/// Acknowledgement of a recorded contribution.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub circle_id: CircleId,
    pub round_index: u32,
    pub member_id: MemberId,
    /// Content digest of the stored contribution record, `sha256:<hex>`.
    pub digest: String,
    pub recorded_at: Timestamp,
    /// Phase of the round after this payment.
    pub phase: RoundPhase,
    /// Members still owing a contribution.
    pub remaining: Vec<MemberId>,
}

/// Outcome of completing a round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSettlement {
    pub circle_id: CircleId,
    pub round_index: u32,
    pub recipient: MemberId,
    pub currency: Currency,
    pub pool_commitment: Commitment,
    /// Revealed pool total, if the escrow held every opening.
    pub pool_total: Option<Amount>,
    pub contributions: usize,
    pub completed_at: Timestamp,
    pub circle_completed: bool,
    /// Index of the round opened by this completion.
    pub next_round: Option<u32>,
}

/// State of a single round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub circle_id: CircleId,
    pub round_index: u32,
    pub phase: RoundPhase,
    pub required_contribution: Amount,
    pub paid: Vec<MemberId>,
    pub unpaid: Vec<MemberId>,
    pub recipient: Option<MemberId>,
    /// Who would receive the pool if the round completed now.
    pub projected_recipient: Option<MemberId>,
    pub opened_at: Timestamp,
    pub deadline: Timestamp,
    pub overdue: bool,
    pub pool_commitment: Commitment,
    pub pool_total: Option<Amount>,
    pub settlement: Option<SettlementRecord>,
}

/// A round past its deadline with members still unpaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueRound {
    pub circle_id: CircleId,
    pub round_index: u32,
    pub deadline: Timestamp,
    pub unpaid: Vec<MemberId>,
}

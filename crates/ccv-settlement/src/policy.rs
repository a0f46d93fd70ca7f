//! Recipient selection.
//!
//! A round's pool goes to one eligible member: active, and not yet paid
//! out in this circle. The default [`RoundRobin`] policy pays members in
//! join order, which makes every payout schedule predictable from the
//! roster alone.

use ccv_state::Membership;

/// Chooses the recipient of a round from the eligible members.
pub trait RecipientPolicy: Send + Sync {
    /// Pick one of `eligible`. Returns `None` only if `eligible` is empty.
    fn select<'a>(&self, eligible: &[&'a Membership]) -> Option<&'a Membership>;

    /// Policy name, for logs.
    fn name(&self) -> &'static str;
}

/// Earliest join time first; ties broken by join sequence, then member id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobin;

impl RecipientPolicy for RoundRobin {
    fn select<'a>(&self, eligible: &[&'a Membership]) -> Option<&'a Membership> {
        eligible
            .iter()
            .copied()
            .min_by(|a, b| {
                (a.joined_at, a.join_seq, &a.member_id).cmp(&(b.joined_at, b.join_seq, &b.member_id))
            })
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

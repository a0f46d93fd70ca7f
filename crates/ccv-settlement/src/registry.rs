//! # Circle Registry
//!
//! Owns every circle aggregate. The map is behind its own `RwLock`; each
//! aggregate (circle, roster, rounds) sits behind a per-circle
//! `Arc<RwLock<_>>`, so operations on different circles never contend and
//! every mutation of one circle is serialized. Locks are synchronous and
//! never held across `.await`.
//!
//! Administrative operations (join, activate, cancel, exclude) stage their
//! changes on a clone of the aggregate and swap it in only when every step
//! succeeded.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use ccv_core::{CircleId, MemberId, Timestamp};
use ccv_crypto::Commitment;
use ccv_state::{Circle, CircleStatus, CircleTerms, Membership, Round, RoundPhase};

use crate::clock::{Clock, SystemClock};
use crate::config::SettlementConfig;
use crate::error::CircleError;
use crate::policy::{RecipientPolicy, RoundRobin};
use crate::view::{
    CircleFilter, CircleSnapshot, CircleSummary, CreateCircleParams, DashboardEntry, JoinOutcome,
    MemberDashboard, MemberView, RoundPool,
};

// ─── Aggregate ───────────────────────────────────────────────────────

/// One circle with its roster and rounds.
#[derive(Debug, Clone)]
pub(crate) struct CircleAggregate {
    pub(crate) circle: Circle,
    pub(crate) members: BTreeMap<MemberId, Membership>,
    /// Indexed by round index.
    pub(crate) rounds: Vec<Round>,
    next_join_seq: u64,
}

impl CircleAggregate {
    fn new(circle: Circle) -> Self {
        Self {
            circle,
            members: BTreeMap::new(),
            rounds: Vec::new(),
            next_join_seq: 0,
        }
    }

    pub(crate) fn id(&self) -> CircleId {
        self.circle.id
    }

    pub(crate) fn active_count(&self) -> u32 {
        self.members.values().filter(|m| m.active).count() as u32
    }

    pub(crate) fn eligible(&self) -> Vec<&Membership> {
        self.members
            .values()
            .filter(|m| m.is_eligible_recipient())
            .collect()
    }

    fn in_join_order(&self) -> Vec<&Membership> {
        let mut members: Vec<&Membership> = self.members.values().collect();
        members.sort_by_key(|m| m.join_seq);
        members
    }

    /// Members owing a contribution to round `index`, in join order.
    pub(crate) fn obligated(&self, index: u32) -> Vec<&Membership> {
        self.in_join_order()
            .into_iter()
            .filter(|m| m.owes_round(index))
            .collect()
    }

    pub(crate) fn unpaid(&self, round: &Round) -> Vec<MemberId> {
        round.unpaid(self.obligated(round.index).into_iter().map(|m| &m.member_id))
    }

    /// The round at `current_round`, while the circle is active.
    pub(crate) fn open_round(&self) -> Option<&Round> {
        if self.circle.status != CircleStatus::Active {
            return None;
        }
        self.rounds.get(self.circle.current_round as usize)
    }

    pub(crate) fn projected_recipient(&self, policy: &dyn RecipientPolicy) -> Option<MemberId> {
        self.open_round()?;
        policy
            .select(&self.eligible())
            .map(|m| m.member_id.clone())
    }

    /// Rounds needed so every eligible member is paid once, bounded by capacity.
    fn rounds_needed(&self, circle: &Circle) -> u32 {
        let eligible = self.eligible().len() as u32;
        circle
            .current_round
            .saturating_add(eligible)
            .min(circle.terms.capacity)
    }

    /// FORMING → ACTIVE and open round 0. Leaves `self` untouched on error.
    fn start(&mut self, now: Timestamp, reason: &str) -> Result<(), CircleError> {
        let id = self.id();
        let mut circle = self.circle.clone();
        circle
            .activate(now, reason)
            .map_err(|e| CircleError::InvalidTransition {
                circle_id: id,
                reason: e.to_string(),
            })?;
        let needed = self.rounds_needed(&circle);
        if needed > circle.total_rounds() {
            circle
                .extend_rounds(needed)
                .map_err(|e| CircleError::internal(id, e))?;
        }
        let terms = &circle.terms;
        let deadline = terms
            .start_time
            .max(now)
            .saturating_add_secs(terms.frequency.window_secs());
        let round = Round::open(id, 0, terms.per_round_amount, now, deadline);
        tracing::info!(
            circle_id = %id,
            members = self.active_count(),
            total_rounds = circle.total_rounds(),
            deadline = %deadline,
            "circle activated, round 0 open"
        );
        self.circle = circle;
        self.rounds.push(round);
        Ok(())
    }

    /// Move the open round to recipient selection if nobody still owes.
    pub(crate) fn close_if_fully_paid(
        &mut self,
        now: Timestamp,
        reason: &str,
    ) -> Result<bool, CircleError> {
        let id = self.id();
        let Some(round) = self.open_round() else {
            return Ok(false);
        };
        if round.phase != RoundPhase::Open || !self.unpaid(round).is_empty() {
            return Ok(false);
        }
        let index = self.circle.current_round as usize;
        if let Some(round) = self.rounds.get_mut(index) {
            round
                .close_payments(now, reason)
                .map_err(|e| CircleError::internal(id, e))?;
            tracing::info!(circle_id = %id, round_index = index, reason, "round closed for payments");
        }
        Ok(true)
    }

    /// Void the round at the counter when the circle completed before it
    /// could pay out. Its contributions are reported as owed back.
    fn void_stranded_round(&mut self, now: Timestamp, reason: &str) -> Result<(), CircleError> {
        let id = self.id();
        let index = self.circle.current_round;
        let Some(round) = self.rounds.get_mut(index as usize) else {
            return Ok(());
        };
        if round.phase.is_terminal() {
            return Ok(());
        }
        let owed = round
            .void(now, reason)
            .map_err(|e| CircleError::internal(id, e))?;
        if owed.is_empty() {
            tracing::info!(circle_id = %id, round_index = index, "unpaid round voided");
        } else {
            tracing::warn!(
                circle_id = %id,
                round_index = index,
                refunds_owed = owed.len(),
                members = ?owed,
                "round voided with contributions owed back"
            );
        }
        Ok(())
    }

    pub(crate) fn summary(&self, policy: &dyn RecipientPolicy) -> CircleSummary {
        let terms: &CircleTerms = &self.circle.terms;
        CircleSummary {
            id: self.circle.id,
            name: terms.name.clone(),
            description: terms.description.clone(),
            currency: terms.currency,
            frequency: terms.frequency,
            per_round_amount: terms.per_round_amount,
            capacity: terms.capacity,
            member_count: self.active_count(),
            current_round: self.circle.current_round,
            total_rounds: terms.total_rounds,
            status: self.circle.status,
            start_time: terms.start_time,
            next_payment_due: self.open_round().map(|r| r.deadline),
            next_recipient: self.projected_recipient(policy),
        }
    }

    fn snapshot(&self, policy: &dyn RecipientPolicy) -> Result<CircleSnapshot, CircleError> {
        let pools = self
            .rounds
            .iter()
            .map(|r| {
                Ok(RoundPool {
                    round_index: r.index,
                    commitment: r
                        .pool_commitment()
                        .map_err(|e| CircleError::internal(self.id(), e))?,
                    total: r.pool_total(),
                    contributions: r.contributions.len(),
                })
            })
            .collect::<Result<Vec<_>, CircleError>>()?;
        Ok(CircleSnapshot {
            circle: self.circle.clone(),
            members: self.in_join_order().into_iter().cloned().collect(),
            rounds: self.rounds.clone(),
            open_round: self.open_round().map(|r| r.index),
            next_recipient: self.projected_recipient(policy),
            pools,
        })
    }

    fn paid_current_round(&self, member: &MemberId) -> bool {
        self.open_round().is_some_and(|r| r.has_paid(member))
    }
}

// ─── Registry ────────────────────────────────────────────────────────

type CircleHandle = Arc<RwLock<CircleAggregate>>;

/// Registry of lending circles.
///
/// Constructed once at process start and shared by reference (typically
/// inside an `Arc`).
pub struct CircleRegistry {
    circles: RwLock<HashMap<CircleId, CircleHandle>>,
    pub(crate) config: SettlementConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) policy: Arc<dyn RecipientPolicy>,
}

impl std::fmt::Debug for CircleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleRegistry")
            .field("circles", &self.len())
            .field("config", &self.config)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl Default for CircleRegistry {
    fn default() -> Self {
        Self::new(SettlementConfig::default())
    }
}

impl CircleRegistry {
    /// Empty registry on the system clock with round-robin payouts.
    pub fn new(config: SettlementConfig) -> Self {
        Self {
            circles: RwLock::new(HashMap::new()),
            config,
            clock: Arc::new(SystemClock),
            policy: Arc::new(RoundRobin),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the recipient policy.
    pub fn with_policy(mut self, policy: Arc<dyn RecipientPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Number of circles.
    pub fn len(&self) -> usize {
        self.circles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.read().is_empty()
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn handle(&self, circle_id: CircleId) -> Result<CircleHandle, CircleError> {
        self.circles
            .read()
            .get(&circle_id)
            .cloned()
            .ok_or(CircleError::NotFound { circle_id })
    }

    pub(crate) fn handles(&self) -> Vec<CircleHandle> {
        self.circles.read().values().cloned().collect()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Create a circle in `Forming`. The creator is not enrolled.
    pub fn create_circle(&self, params: CreateCircleParams) -> Result<Circle, CircleError> {
        self.validate_params(&params)?;
        let id = CircleId::new();
        let now = self.now();
        let circle = Circle::new(
            id,
            CircleTerms {
                name: params.name.trim().to_string(),
                description: params.description,
                creator: params.creator,
                currency: params.currency,
                frequency: params.frequency,
                capacity: params.capacity,
                per_round_amount: params.per_round_amount,
                total_rounds: params.total_rounds,
                start_time: params.start_time,
            },
            now,
        );
        tracing::info!(
            circle_id = %id,
            creator = %circle.terms.creator,
            capacity = circle.terms.capacity,
            total_rounds = circle.terms.total_rounds,
            "circle created"
        );
        self.circles
            .write()
            .insert(id, Arc::new(RwLock::new(CircleAggregate::new(circle.clone()))));
        Ok(circle)
    }

    fn validate_params(&self, params: &CreateCircleParams) -> Result<(), CircleError> {
        let invalid = |reason: String| Err(CircleError::InvalidParameters { reason });
        let name = params.name.trim();
        if name.is_empty() {
            return invalid("name must not be empty".to_string());
        }
        if name.len() > self.config.max_name_len {
            return invalid(format!(
                "name exceeds {} bytes",
                self.config.max_name_len
            ));
        }
        if params.description.len() > self.config.max_description_len {
            return invalid(format!(
                "description exceeds {} bytes",
                self.config.max_description_len
            ));
        }
        if params.capacity < self.config.min_members {
            return invalid(format!(
                "capacity must be at least {}, got {}",
                self.config.min_members, params.capacity
            ));
        }
        if params.capacity > self.config.max_capacity {
            return invalid(format!(
                "capacity must be at most {}, got {}",
                self.config.max_capacity, params.capacity
            ));
        }
        if params.per_round_amount.is_zero() {
            return invalid("per-round amount must be positive".to_string());
        }
        if params.total_rounds < 1 {
            return invalid("a circle needs at least one round".to_string());
        }
        if params.total_rounds > params.capacity {
            return invalid(format!(
                "total rounds ({}) exceed capacity ({})",
                params.total_rounds, params.capacity
            ));
        }
        Ok(())
    }

    /// Add `member_id` to a forming or active circle.
    ///
    /// Filling a forming circle to capacity activates it. A member joining
    /// an active circle owes contributions from the open round if it still
    /// accepts payments, otherwise from the next one, and the schedule grows
    /// so they also receive the pool once.
    pub fn join_circle(
        &self,
        circle_id: CircleId,
        member_id: MemberId,
    ) -> Result<JoinOutcome, CircleError> {
        let handle = self.handle(circle_id)?;
        let now = self.now();
        let mut agg = handle.write();

        let status = agg.circle.status;
        if status.is_terminal() {
            return Err(CircleError::CircleClosed { circle_id, status });
        }
        if agg.members.contains_key(&member_id) {
            return Err(CircleError::AlreadyJoined {
                circle_id,
                member_id,
            });
        }
        let capacity = agg.circle.terms.capacity;
        if agg.active_count() >= capacity {
            return Err(CircleError::CircleFull {
                circle_id,
                capacity,
            });
        }

        let first_round = match agg.open_round() {
            Some(r) if r.phase == RoundPhase::Open => r.index,
            Some(r) => r.index + 1,
            None => 0,
        };

        let mut staged = agg.clone();
        let membership = Membership::new(
            circle_id,
            member_id.clone(),
            now,
            staged.next_join_seq,
            first_round,
        );
        staged.members.insert(member_id.clone(), membership.clone());
        staged.next_join_seq += 1;

        let mut activated = false;
        match status {
            CircleStatus::Forming if staged.active_count() >= capacity => {
                staged.start(now, "circle reached capacity")?;
                activated = true;
            }
            CircleStatus::Active => {
                let needed = staged.rounds_needed(&staged.circle);
                if needed > staged.circle.total_rounds() {
                    staged
                        .circle
                        .extend_rounds(needed)
                        .map_err(|e| CircleError::internal(circle_id, e))?;
                }
            }
            _ => {}
        }

        let status = staged.circle.status;
        *agg = staged;
        tracing::info!(
            circle_id = %circle_id,
            member_id = %member_id,
            first_round,
            %status,
            "member joined circle"
        );
        Ok(JoinOutcome {
            membership,
            status,
            activated,
        })
    }

    /// FORMING → ACTIVE once at least `max(min_members, total_rounds)`
    /// members are active.
    pub fn activate(&self, circle_id: CircleId) -> Result<Circle, CircleError> {
        let handle = self.handle(circle_id)?;
        let now = self.now();
        let mut agg = handle.write();

        if agg.circle.status != CircleStatus::Forming {
            return Err(CircleError::InvalidTransition {
                circle_id,
                reason: format!("cannot activate a {} circle", agg.circle.status),
            });
        }
        let required = self.config.min_members.max(agg.circle.total_rounds());
        let members = agg.active_count();
        if members < required {
            return Err(CircleError::InsufficientMembers {
                circle_id,
                members,
                required,
            });
        }
        agg.start(now, "activated by operator")?;
        Ok(agg.circle.clone())
    }

    /// FORMING or ACTIVE → CANCELLED. The open round is left as it is and
    /// accepts nothing further.
    pub fn cancel(&self, circle_id: CircleId, reason: &str) -> Result<Circle, CircleError> {
        let handle = self.handle(circle_id)?;
        let now = self.now();
        let mut agg = handle.write();

        let status = agg.circle.status;
        if status.is_terminal() {
            return Err(CircleError::CircleClosed { circle_id, status });
        }
        let mut circle = agg.circle.clone();
        circle
            .cancel(now, reason)
            .map_err(|e| CircleError::InvalidTransition {
                circle_id,
                reason: e.to_string(),
            })?;
        agg.circle = circle;
        tracing::info!(circle_id = %circle_id, from = %status, reason, "circle cancelled");
        Ok(agg.circle.clone())
    }

    /// Mark a member inactive.
    ///
    /// If they were the last member owing the open round, the round moves
    /// on to recipient selection. If fewer eligible recipients remain than
    /// rounds, the schedule shrinks, which completes the circle when no
    /// rounds are left. A round already opened at that point can no longer
    /// pay out; it is voided and its contributions reported as owed back.
    pub fn exclude_member(
        &self,
        circle_id: CircleId,
        member_id: &MemberId,
        reason: &str,
    ) -> Result<Membership, CircleError> {
        let handle = self.handle(circle_id)?;
        let now = self.now();
        let mut agg = handle.write();

        let status = agg.circle.status;
        if status.is_terminal() {
            return Err(CircleError::CircleClosed { circle_id, status });
        }
        if !agg.members.get(member_id).is_some_and(|m| m.active) {
            return Err(CircleError::NotAMember {
                circle_id,
                member_id: member_id.clone(),
            });
        }

        let mut staged = agg.clone();
        let membership = staged
            .members
            .get_mut(member_id)
            .ok_or_else(|| CircleError::internal(circle_id, "member vanished during exclusion"))?;
        membership
            .deactivate(reason)
            .map_err(|e| CircleError::internal(circle_id, e))?;
        let membership = membership.clone();

        if staged.circle.status == CircleStatus::Active {
            let needed = staged.rounds_needed(&staged.circle);
            let mut completed = false;
            if needed < staged.circle.total_rounds() {
                completed = staged
                    .circle
                    .shrink_rounds(needed, now)
                    .map_err(|e| CircleError::internal(circle_id, e))?;
            }
            if completed {
                tracing::info!(
                    circle_id = %circle_id,
                    rounds = staged.circle.current_round,
                    "circle completed after exclusion left no eligible recipients"
                );
                staged.void_stranded_round(now, "circle completed, no eligible recipient")?;
            } else {
                staged.close_if_fully_paid(now, "remaining members paid after exclusion")?;
            }
        }

        *agg = staged;
        tracing::warn!(
            circle_id = %circle_id,
            member_id = %member_id,
            reason,
            total_rounds = agg.circle.total_rounds(),
            "member excluded"
        );
        Ok(membership)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Snapshot of one circle.
    pub fn get_circle_state(&self, circle_id: CircleId) -> Result<CircleSnapshot, CircleError> {
        let handle = self.handle(circle_id)?;
        let agg = handle.read();
        agg.snapshot(self.policy.as_ref())
    }

    /// A member's standing in one circle. Excluded members are still reported.
    pub fn get_member_state(
        &self,
        circle_id: CircleId,
        member_id: &MemberId,
    ) -> Result<MemberView, CircleError> {
        let handle = self.handle(circle_id)?;
        let agg = handle.read();
        let membership = agg
            .members
            .get(member_id)
            .cloned()
            .ok_or_else(|| CircleError::NotAMember {
                circle_id,
                member_id: member_id.clone(),
            })?;
        let owes_current_round = agg
            .open_round()
            .is_some_and(|r| r.phase == RoundPhase::Open && membership.owes_round(r.index));
        Ok(MemberView {
            owes_current_round,
            paid_current_round: agg.paid_current_round(member_id),
            is_next_recipient: agg.projected_recipient(self.policy.as_ref()).as_ref()
                == Some(member_id),
            circle_status: agg.circle.status,
            membership,
        })
    }

    /// Circles matching `filter`, oldest first.
    pub fn list_circles(&self, filter: &CircleFilter) -> Vec<CircleSummary> {
        let mut rows: Vec<(Timestamp, CircleSummary)> = self
            .handles()
            .into_iter()
            .filter_map(|handle| {
                let agg = handle.read();
                let keep = match filter {
                    CircleFilter::All => true,
                    CircleFilter::Joined(member) => agg.members.contains_key(member),
                    CircleFilter::Available(member) => {
                        agg.circle.status == CircleStatus::Forming
                            && !agg.members.contains_key(member)
                    }
                };
                keep.then(|| (agg.circle.created_at, agg.summary(self.policy.as_ref())))
            })
            .collect();
        rows.sort_by(|(a_at, a), (b_at, b)| a_at.cmp(b_at).then_with(|| a.id.cmp(&b.id)));
        rows.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Statistics for one member across every circle they joined.
    pub fn member_dashboard(&self, member_id: &MemberId) -> MemberDashboard {
        let mut rows: Vec<(Timestamp, DashboardEntry, u32)> = Vec::new();
        for handle in self.handles() {
            let agg = handle.read();
            let Some(membership) = agg.members.get(member_id) else {
                continue;
            };
            let summary = agg.summary(self.policy.as_ref());
            let entry = DashboardEntry {
                active_member: membership.active,
                paid_current_round: agg.paid_current_round(member_id),
                is_next_recipient: summary.next_recipient.as_ref() == Some(member_id),
                payout_round: membership.payout_round,
                circle: summary,
            };
            rows.push((membership.joined_at, entry, membership.rounds_participated));
        }
        rows.sort_by(|(a_at, a, _), (b_at, b, _)| {
            a_at.cmp(b_at).then_with(|| a.circle.id.cmp(&b.circle.id))
        });

        let count = |status: CircleStatus| {
            rows.iter()
                .filter(|(_, e, _)| e.circle.status == status)
                .count() as u32
        };
        MemberDashboard {
            member_id: member_id.clone(),
            circles_joined: rows.len() as u32,
            active_circles: count(CircleStatus::Active),
            completed_circles: count(CircleStatus::Completed),
            payouts_received: rows
                .iter()
                .filter(|(_, e, _)| e.payout_round.is_some())
                .count() as u32,
            rounds_participated: rows.iter().map(|(_, _, n)| n).sum(),
            circles: rows.into_iter().map(|(_, e, _)| e).collect(),
        }
    }
}

/// Pool commitment of the round, or the identity if it holds no contributions.
pub(crate) fn pool_commitment(agg: &CircleAggregate, round: &Round) -> Result<Commitment, CircleError> {
    round
        .pool_commitment()
        .map_err(|e| CircleError::internal(agg.id(), e))
}

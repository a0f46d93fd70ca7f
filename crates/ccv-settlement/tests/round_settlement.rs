//! End-to-end tests of the registry, membership ledger, and settlement
//! engine against a manual clock.

use std::sync::Arc;

use ccv_core::{Amount, Currency, MemberId, Timestamp};
use ccv_crypto::{
    commit, Commitment, ContributionCommitment, ContributionOpening, PaymentContext,
};
use ccv_settlement::{
    CircleError, CircleFilter, CircleRegistry, Clock, CreateCircleParams, ErrorKind, ManualClock,
    PaymentReceipt, SettlementConfig,
};
use ccv_state::{CircleStatus, PaymentFrequency, RoundPhase, SettlementStatus};
use rand::rngs::OsRng;

/// 2026-01-01T00:00:00Z
const START: i64 = 1_767_225_600;
const WEEK: u64 = 7 * 24 * 60 * 60;

fn member(name: &str) -> MemberId {
    MemberId::new(name).unwrap()
}

fn slot(circle_id: ccv_core::CircleId, round: u32, name: &str) -> PaymentContext {
    PaymentContext::new(circle_id, round, member(name))
}

fn params(capacity: u32, total_rounds: u32) -> CreateCircleParams {
    CreateCircleParams {
        name: "Neighborhood Savers".to_string(),
        description: "Weekly savings among neighbors".to_string(),
        creator: member("organizer"),
        currency: Currency::Usdc,
        frequency: PaymentFrequency::Weekly,
        capacity,
        per_round_amount: Amount(100),
        total_rounds,
        start_time: Timestamp::from_epoch_secs(START).unwrap(),
    }
}

struct Fixture {
    registry: CircleRegistry,
    clock: ManualClock,
}

impl Fixture {
    fn new() -> Self {
        let clock = ManualClock::new(Timestamp::from_epoch_secs(START).unwrap());
        let registry =
            CircleRegistry::new(SettlementConfig::default()).with_clock(Arc::new(clock.clone()));
        Self { registry, clock }
    }

    /// Create a circle and have `names` join one second apart.
    fn circle(&self, capacity: u32, total_rounds: u32, names: &[&str]) -> ccv_core::CircleId {
        let circle = self.registry.create_circle(params(capacity, total_rounds)).unwrap();
        for name in names {
            self.clock.advance_secs(1);
            self.registry.join_circle(circle.id, member(name)).unwrap();
        }
        circle.id
    }

    fn pay(
        &self,
        circle_id: ccv_core::CircleId,
        round: u32,
        name: &str,
        amount: u64,
    ) -> Result<(PaymentReceipt, ContributionOpening), CircleError> {
        let (contribution, opening) =
            commit(Amount(amount), Amount(100), &slot(circle_id, round, name), &mut OsRng)
                .unwrap();
        self.registry
            .record_payment(circle_id, round, &member(name), contribution)
            .map(|receipt| (receipt, opening))
    }
}

#[test]
fn round_robin_pays_members_in_join_order() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    assert_eq!(
        f.registry.get_circle_state(id).unwrap().circle.status,
        CircleStatus::Active
    );

    let mut recipients = Vec::new();
    for round in 0..3 {
        for name in ["carol", "alice", "bob"] {
            f.pay(id, round, name, 100).unwrap();
        }
        let settlement = f.registry.complete_round(id, round).unwrap();
        recipients.push(settlement.recipient.to_string());
        assert_eq!(settlement.circle_completed, round == 2);
    }
    assert_eq!(recipients, ["alice", "bob", "carol"]);

    let snapshot = f.registry.get_circle_state(id).unwrap();
    assert_eq!(snapshot.circle.status, CircleStatus::Completed);
    assert_eq!(snapshot.circle.current_round, 3);
    assert_eq!(snapshot.open_round, None);
    let payouts: Vec<_> = snapshot.members.iter().map(|m| m.payout_round).collect();
    assert_eq!(payouts, [Some(0), Some(1), Some(2)]);
    for m in &snapshot.members {
        assert_eq!(m.rounds_participated, 3);
        assert_eq!(m.minimum_contributed, Amount(300));
    }
}

#[test]
fn join_fails_when_circle_is_full() {
    let f = Fixture::new();
    let id = f.circle(5, 5, &["a1", "a2", "a3", "a4", "a5"]);
    let err = f.registry.join_circle(id, member("a6")).unwrap_err();
    assert_eq!(
        err,
        CircleError::CircleFull {
            circle_id: id,
            capacity: 5
        }
    );
    assert_eq!(f.registry.get_circle_state(id).unwrap().members.len(), 5);
}

#[test]
fn filling_the_circle_activates_it_and_opens_round_zero() {
    let f = Fixture::new();
    let circle = f.registry.create_circle(params(3, 3)).unwrap();
    let first = f.registry.join_circle(circle.id, member("alice")).unwrap();
    assert!(!first.activated);
    assert_eq!(first.status, CircleStatus::Forming);
    f.registry.join_circle(circle.id, member("bob")).unwrap();
    let last = f.registry.join_circle(circle.id, member("carol")).unwrap();
    assert!(last.activated);
    assert_eq!(last.status, CircleStatus::Active);

    let round = f
        .registry
        .round_state(circle.id, 0, f.clock.now())
        .unwrap();
    assert_eq!(round.phase, RoundPhase::Open);
    assert_eq!(round.unpaid.len(), 3);
    assert_eq!(round.projected_recipient, Some(member("alice")));
    assert_eq!(round.deadline.epoch_secs(), START + WEEK as i64);
}

#[test]
fn duplicate_payment_leaves_ledger_unchanged() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    f.pay(id, 0, "alice", 100).unwrap();
    let before = f.registry.get_circle_state(id).unwrap();

    let err = f.pay(id, 0, "alice", 100).unwrap_err();
    assert_eq!(
        err,
        CircleError::DuplicatePayment {
            circle_id: id,
            round_index: 0,
            member_id: member("alice")
        }
    );
    assert_eq!(err.kind(), ErrorKind::StaleState);

    let after = f.registry.get_circle_state(id).unwrap();
    assert_eq!(after.rounds[0].contributions, before.rounds[0].contributions);
    assert_eq!(after.members, before.members);
}

#[test]
fn concurrent_last_payment_succeeds_exactly_once() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    f.pay(id, 0, "alice", 100).unwrap();
    f.pay(id, 0, "bob", 100).unwrap();

    let (c1, _) = commit(Amount(100), Amount(100), &slot(id, 0, "carol"), &mut OsRng).unwrap();
    let (c2, _) = commit(Amount(100), Amount(100), &slot(id, 0, "carol"), &mut OsRng).unwrap();
    let carol = member("carol");
    let results: Vec<Result<PaymentReceipt, CircleError>> = std::thread::scope(|s| {
        let handles: Vec<_> = [c1, c2]
            .into_iter()
            .map(|c: ContributionCommitment| {
                let registry = &f.registry;
                let carol = &carol;
                s.spawn(move || registry.record_payment(id, 0, carol, c))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let dup = results
        .iter()
        .filter(|r| matches!(r, Err(CircleError::DuplicatePayment { .. })))
        .count();
    assert_eq!((ok, dup), (1, 1));

    let snapshot = f.registry.get_circle_state(id).unwrap();
    assert_eq!(snapshot.rounds[0].contributions.len(), 3);
    assert_eq!(snapshot.rounds[0].phase, RoundPhase::AwaitingRecipientSelection);
    let carol_state = f.registry.get_member_state(id, &carol).unwrap();
    assert_eq!(carol_state.membership.rounds_participated, 1);
}

#[test]
fn last_payment_moves_round_to_recipient_selection() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    let (receipt, _) = f.pay(id, 0, "alice", 100).unwrap();
    assert_eq!(receipt.phase, RoundPhase::Open);
    assert_eq!(receipt.remaining, vec![member("bob"), member("carol")]);
    assert!(receipt.digest.starts_with("sha256:"));
    f.pay(id, 0, "bob", 100).unwrap();
    let (receipt, _) = f.pay(id, 0, "carol", 100).unwrap();
    assert_eq!(receipt.phase, RoundPhase::AwaitingRecipientSelection);
    assert!(receipt.remaining.is_empty());
}

#[test]
fn outstanding_before_deadline_overdue_after() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    f.pay(id, 0, "alice", 100).unwrap();

    let err = f.registry.complete_round(id, 0).unwrap_err();
    assert_eq!(
        err,
        CircleError::PaymentsOutstanding {
            circle_id: id,
            round_index: 0,
            unpaid: vec![member("bob"), member("carol")],
        }
    );
    assert_eq!(err.kind(), ErrorKind::Recoverable);
    assert!(f.registry.overdue_rounds(f.clock.now()).is_empty());

    f.clock.advance_secs(WEEK + 60);
    let err = f.registry.complete_round(id, 0).unwrap_err();
    match &err {
        CircleError::PaymentOverdue {
            unpaid, deadline, ..
        } => {
            assert_eq!(unpaid, &vec![member("bob"), member("carol")]);
            // Activated by the third join, three seconds after START.
            assert_eq!(deadline.epoch_secs(), START + 3 + WEEK as i64);
        }
        other => panic!("expected PaymentOverdue, got {other:?}"),
    }

    let round = f.registry.round_state(id, 0, f.clock.now()).unwrap();
    assert_eq!(round.phase, RoundPhase::Open);
    assert!(round.overdue);

    let overdue = f.registry.overdue_rounds(f.clock.now());
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].circle_id, id);
    assert_eq!(overdue[0].unpaid, vec![member("bob"), member("carol")]);

    // Late payments are still accepted while the round is open.
    f.pay(id, 0, "bob", 100).unwrap();
    f.pay(id, 0, "carol", 100).unwrap();
    assert!(f.registry.complete_round(id, 0).is_ok());
}

#[test]
fn payment_preconditions() {
    let f = Fixture::new();
    let circle = f.registry.create_circle(params(3, 3)).unwrap();
    f.registry.join_circle(circle.id, member("alice")).unwrap();
    assert!(matches!(
        f.pay(circle.id, 0, "alice", 100),
        Err(CircleError::CircleNotActive {
            status: CircleStatus::Forming,
            ..
        })
    ));

    f.registry.join_circle(circle.id, member("bob")).unwrap();
    f.registry.join_circle(circle.id, member("carol")).unwrap();
    assert!(matches!(
        f.pay(circle.id, 1, "alice", 100),
        Err(CircleError::RoundNotOpen {
            round_index: 1,
            current_round: 0,
            ..
        })
    ));
    assert!(matches!(
        f.pay(circle.id, 0, "mallory", 100),
        Err(CircleError::NotAMember { .. })
    ));

    for name in ["alice", "bob", "carol"] {
        f.pay(circle.id, 0, name, 100).unwrap();
    }
    f.registry.complete_round(circle.id, 0).unwrap();
    assert!(matches!(
        f.pay(circle.id, 0, "alice", 100),
        Err(CircleError::DuplicatePayment { .. })
    ));
    assert!(matches!(
        f.registry.complete_round(circle.id, 0),
        Err(CircleError::RoundClosed { round_index: 0, .. })
    ));
    assert!(matches!(
        f.registry.complete_round(circle.id, 5),
        Err(CircleError::RoundNotOpen { .. })
    ));
}

#[test]
fn underfunded_commitment_is_rejected() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    // A valid proof for a lower minimum does not satisfy the round.
    let (contribution, _) =
        commit(Amount(60), Amount(60), &slot(id, 0, "alice"), &mut OsRng).unwrap();
    let err = f
        .registry
        .record_payment(id, 0, &member("alice"), contribution)
        .unwrap_err();
    assert_eq!(
        err,
        CircleError::InvalidCommitment {
            circle_id: id,
            round_index: 0,
            member_id: member("alice")
        }
    );
    let round = f.registry.round_state(id, 0, f.clock.now()).unwrap();
    assert!(round.paid.is_empty());
    assert_eq!(round.pool_commitment, Commitment::identity());
}

#[test]
fn commitment_copied_from_another_member_is_rejected() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    f.pay(id, 0, "alice", 100).unwrap();

    // Commitments and proofs are public in every snapshot.
    let published = f.registry.get_circle_state(id).unwrap().rounds[0].contributions
        [&member("alice")]
        .clone();
    let copied = ContributionCommitment {
        commitment: published.commitment,
        proof: published.proof,
    };
    let err = f
        .registry
        .record_payment(id, 0, &member("bob"), copied)
        .unwrap_err();
    assert_eq!(
        err,
        CircleError::InvalidCommitment {
            circle_id: id,
            round_index: 0,
            member_id: member("bob")
        }
    );
    assert_eq!(err.kind(), ErrorKind::Input);
    let round = f.registry.round_state(id, 0, f.clock.now()).unwrap();
    assert_eq!(round.paid, vec![member("alice")]);
}

#[test]
fn own_commitment_cannot_be_replayed_in_a_later_round() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    let (contribution, _) =
        commit(Amount(100), Amount(100), &slot(id, 0, "alice"), &mut OsRng).unwrap();
    f.registry
        .record_payment(id, 0, &member("alice"), contribution.clone())
        .unwrap();
    f.pay(id, 0, "bob", 100).unwrap();
    f.pay(id, 0, "carol", 100).unwrap();
    f.registry.complete_round(id, 0).unwrap();

    let err = f
        .registry
        .record_payment(id, 1, &member("alice"), contribution)
        .unwrap_err();
    assert!(matches!(
        err,
        CircleError::InvalidCommitment { round_index: 1, .. }
    ));
    assert!(f.registry.round_state(id, 1, f.clock.now()).unwrap().paid.is_empty());
}

#[test]
fn proof_built_for_another_slot_is_rejected() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    // Fresh commitment, but proven for alice's slot.
    let (contribution, _) =
        commit(Amount(100), Amount(100), &slot(id, 0, "alice"), &mut OsRng).unwrap();
    assert!(matches!(
        f.registry.record_payment(id, 0, &member("bob"), contribution),
        Err(CircleError::InvalidCommitment { .. })
    ));
}

#[test]
fn escrow_reveals_only_the_pool_total() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    let mut openings = Vec::new();
    for (name, amount) in [("alice", 100), ("bob", 120), ("carol", 150)] {
        let (_, opening) = f.pay(id, 0, name, amount).unwrap();
        openings.push((name, opening));
    }
    let round = f.registry.round_state(id, 0, f.clock.now()).unwrap();
    assert_eq!(round.pool_total, None);

    let (alice, alice_opening) = &openings[0];
    assert!(matches!(
        f.registry
            .deposit_opening(id, 0, &member("bob"), alice_opening),
        Err(CircleError::OpeningMismatch { .. })
    ));
    for (name, opening) in &openings {
        f.registry
            .deposit_opening(id, 0, &member(name), opening)
            .unwrap();
    }
    assert!(matches!(
        f.registry.deposit_opening(id, 0, &member(alice), alice_opening),
        Err(CircleError::DuplicatePayment { .. })
    ));

    let settlement = f.registry.complete_round(id, 0).unwrap();
    assert_eq!(settlement.pool_total, Some(Amount(370)));
    assert_eq!(settlement.contributions, 3);
    assert_eq!(settlement.currency, Currency::Usdc);
    assert_eq!(settlement.next_round, Some(1));
}

#[test]
fn deposit_requires_a_recorded_commitment() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    let (_, opening) =
        commit(Amount(100), Amount(100), &slot(id, 0, "alice"), &mut OsRng).unwrap();
    assert!(matches!(
        f.registry.deposit_opening(id, 0, &member("alice"), &opening),
        Err(CircleError::NoCommitment { .. })
    ));
    assert!(matches!(
        f.registry.deposit_opening(id, 0, &member("zed"), &opening),
        Err(CircleError::NotAMember { .. })
    ));
}

#[test]
fn excluding_the_last_unpaid_member_closes_the_round_and_shrinks_the_schedule() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    f.pay(id, 0, "alice", 100).unwrap();
    f.pay(id, 0, "bob", 100).unwrap();

    let excluded = f
        .registry
        .exclude_member(id, &member("carol"), "missed payment")
        .unwrap();
    assert!(!excluded.active);

    let snapshot = f.registry.get_circle_state(id).unwrap();
    assert_eq!(snapshot.circle.total_rounds(), 2);
    assert_eq!(snapshot.rounds[0].phase, RoundPhase::AwaitingRecipientSelection);

    assert_eq!(f.registry.complete_round(id, 0).unwrap().recipient, member("alice"));
    assert!(matches!(
        f.pay(id, 1, "carol", 100),
        Err(CircleError::NotAMember { .. })
    ));
    f.pay(id, 1, "alice", 100).unwrap();
    f.pay(id, 1, "bob", 100).unwrap();
    let last = f.registry.complete_round(id, 1).unwrap();
    assert_eq!(last.recipient, member("bob"));
    assert!(last.circle_completed);
    assert_eq!(
        f.registry.get_circle_state(id).unwrap().circle.status,
        CircleStatus::Completed
    );
}

#[test]
fn excluding_the_last_eligible_member_completes_the_circle() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    for round in 0..2 {
        for name in ["alice", "bob", "carol"] {
            f.pay(id, round, name, 100).unwrap();
        }
        f.registry.complete_round(id, round).unwrap();
    }
    f.registry
        .exclude_member(id, &member("carol"), "left the circle")
        .unwrap();
    let snapshot = f.registry.get_circle_state(id).unwrap();
    assert_eq!(snapshot.circle.status, CircleStatus::Completed);
    assert_eq!(snapshot.circle.total_rounds(), 2);
    assert_eq!(snapshot.circle.current_round, 2);
    assert_eq!(snapshot.rounds[2].phase, RoundPhase::Voided);
}

#[test]
fn exclusion_that_completes_the_circle_voids_a_paid_in_round() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    for round in 0..2 {
        for name in ["alice", "bob", "carol"] {
            f.pay(id, round, name, 100).unwrap();
        }
        f.registry.complete_round(id, round).unwrap();
    }
    // Carol is the only member still owed a payout.
    f.pay(id, 2, "alice", 100).unwrap();
    f.pay(id, 2, "bob", 100).unwrap();

    f.registry
        .exclude_member(id, &member("carol"), "left the circle")
        .unwrap();

    let snapshot = f.registry.get_circle_state(id).unwrap();
    assert_eq!(snapshot.circle.status, CircleStatus::Completed);
    let round = &snapshot.rounds[2];
    assert_eq!(round.phase, RoundPhase::Voided);
    assert_eq!(round.recipient, None);
    let owed: Vec<_> = round.contributions.keys().cloned().collect();
    assert_eq!(owed, vec![member("alice"), member("bob")]);
    assert!(snapshot.rounds.iter().all(|r| r.phase != RoundPhase::Open));

    assert!(matches!(
        f.registry.complete_round(id, 2),
        Err(CircleError::RoundClosed { round_index: 2, .. })
    ));
    let view = f.registry.round_state(id, 2, f.clock.now()).unwrap();
    assert!(view.unpaid.is_empty());
    assert_eq!(view.paid.len(), 2);
}

#[test]
fn member_joining_an_active_circle_is_scheduled_for_a_payout() {
    let f = Fixture::new();
    let id = f.circle(4, 3, &["alice", "bob", "carol"]);
    f.registry.activate(id).unwrap();
    f.pay(id, 0, "alice", 100).unwrap();

    f.clock.advance_secs(1);
    let joined = f.registry.join_circle(id, member("dave")).unwrap();
    assert_eq!(joined.membership.first_round, 0);
    let snapshot = f.registry.get_circle_state(id).unwrap();
    assert_eq!(snapshot.circle.total_rounds(), 4);

    for name in ["bob", "carol", "dave"] {
        f.pay(id, 0, name, 100).unwrap();
    }
    let mut recipients = vec![f.registry.complete_round(id, 0).unwrap().recipient];
    for round in 1..4 {
        for name in ["alice", "bob", "carol", "dave"] {
            f.pay(id, round, name, 100).unwrap();
        }
        recipients.push(f.registry.complete_round(id, round).unwrap().recipient);
    }
    assert_eq!(
        recipients,
        vec![member("alice"), member("bob"), member("carol"), member("dave")]
    );
}

#[test]
fn activation_requires_enough_members() {
    let f = Fixture::new();
    let id = f.circle(5, 4, &["alice", "bob", "carol"]);
    assert_eq!(
        f.registry.activate(id).unwrap_err(),
        CircleError::InsufficientMembers {
            circle_id: id,
            members: 3,
            required: 4
        }
    );
    f.registry.join_circle(id, member("dave")).unwrap();
    let circle = f.registry.activate(id).unwrap();
    assert_eq!(circle.status, CircleStatus::Active);
    assert!(matches!(
        f.registry.activate(id),
        Err(CircleError::InvalidTransition { .. })
    ));
}

#[test]
fn creation_rejects_invalid_parameters() {
    let f = Fixture::new();
    let cases = [
        CreateCircleParams {
            capacity: 2,
            total_rounds: 2,
            ..params(3, 3)
        },
        CreateCircleParams {
            per_round_amount: Amount::ZERO,
            ..params(3, 3)
        },
        CreateCircleParams {
            total_rounds: 0,
            ..params(3, 3)
        },
        CreateCircleParams {
            total_rounds: 6,
            ..params(5, 5)
        },
        CreateCircleParams {
            name: "   ".to_string(),
            ..params(3, 3)
        },
        CreateCircleParams {
            capacity: 101,
            ..params(3, 3)
        },
    ];
    for case in cases {
        let err = f.registry.create_circle(case).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input, "{err}");
    }
    assert!(f.registry.is_empty());
}

#[test]
fn cancelled_circle_accepts_nothing() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    f.pay(id, 0, "alice", 100).unwrap();
    let circle = f.registry.cancel(id, "organizer dissolved the circle").unwrap();
    assert_eq!(circle.status, CircleStatus::Cancelled);

    assert!(matches!(
        f.pay(id, 0, "bob", 100),
        Err(CircleError::CircleNotActive {
            status: CircleStatus::Cancelled,
            ..
        })
    ));
    assert!(matches!(
        f.registry.cancel(id, "again"),
        Err(CircleError::CircleClosed { .. })
    ));
    assert!(matches!(
        f.registry.join_circle(id, member("dave")),
        Err(CircleError::CircleClosed { .. })
    ));
    let much_later = Timestamp::from_epoch_secs(START + 10 * WEEK as i64).unwrap();
    assert!(f.registry.overdue_rounds(much_later).is_empty());
}

#[test]
fn listings_and_dashboard() {
    let f = Fixture::new();
    let active = f.circle(3, 3, &["alice", "bob", "carol"]);
    let forming = f.circle(4, 4, &["bob"]);
    let other = f.circle(3, 3, &["dave"]);

    let all = f.registry.list_circles(&CircleFilter::All);
    assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), [active, forming, other]);

    let joined = f.registry.list_circles(&CircleFilter::Joined(member("bob")));
    assert_eq!(joined.iter().map(|c| c.id).collect::<Vec<_>>(), [active, forming]);

    let available = f.registry.list_circles(&CircleFilter::Available(member("bob")));
    assert_eq!(available.iter().map(|c| c.id).collect::<Vec<_>>(), [other]);

    for name in ["alice", "bob", "carol"] {
        f.pay(active, 0, name, 100).unwrap();
    }
    f.registry.complete_round(active, 0).unwrap();
    f.pay(active, 1, "bob", 100).unwrap();

    let dashboard = f.registry.member_dashboard(&member("bob"));
    assert_eq!(dashboard.circles_joined, 2);
    assert_eq!(dashboard.active_circles, 1);
    assert_eq!(dashboard.completed_circles, 0);
    assert_eq!(dashboard.payouts_received, 0);
    assert_eq!(dashboard.rounds_participated, 2);
    let entry = &dashboard.circles[0];
    assert_eq!(entry.circle.id, active);
    assert!(entry.is_next_recipient);
    assert!(entry.paid_current_round);

    let alice = f.registry.get_member_state(active, &member("alice")).unwrap();
    assert_eq!(alice.membership.payout_round, Some(0));
    assert!(alice.owes_current_round);
    assert!(!alice.paid_current_round);
    assert!(!alice.is_next_recipient);
}

#[test]
fn settlement_outcome_is_recorded_on_completed_rounds_only() {
    let f = Fixture::new();
    let id = f.circle(3, 3, &["alice", "bob", "carol"]);
    assert!(matches!(
        f.registry.attach_settlement(id, 0, "tx-0".to_string()),
        Err(CircleError::InvalidTransition { .. })
    ));
    for name in ["alice", "bob", "carol"] {
        f.pay(id, 0, name, 100).unwrap();
    }
    f.registry.complete_round(id, 0).unwrap();
    f.registry.attach_settlement(id, 0, "tx-0".to_string()).unwrap();
    f.registry
        .update_settlement_status(id, 0, SettlementStatus::Confirmed)
        .unwrap();
    let round = f.registry.round_state(id, 0, f.clock.now()).unwrap();
    let settlement = round.settlement.unwrap();
    assert_eq!(settlement.handle.as_deref(), Some("tx-0"));
    assert_eq!(settlement.status, SettlementStatus::Confirmed);
}

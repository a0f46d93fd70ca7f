//! Property tests: random sequences of payments, completions, exclusions,
//! and clock ticks never break the round counter or payout invariants.

use std::collections::BTreeSet;
use std::sync::Arc;

use ccv_core::{Amount, CircleId, Currency, MemberId, Timestamp};
use ccv_crypto::{commit, PaymentContext};
use ccv_settlement::{CircleRegistry, CreateCircleParams, ManualClock, SettlementConfig};
use ccv_state::{CircleStatus, PaymentFrequency, RoundPhase};
use proptest::prelude::*;
use rand::rngs::OsRng;

const NAMES: [&str; 4] = ["ana", "ben", "cy", "dee"];

#[derive(Debug, Clone)]
enum Op {
    Pay(usize),
    Complete,
    Exclude(usize),
    TickDays(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..NAMES.len()).prop_map(Op::Pay),
        2 => Just(Op::Complete),
        1 => (0..NAMES.len()).prop_map(Op::Exclude),
        1 => (1u64..10).prop_map(Op::TickDays),
    ]
}

fn setup(capacity: u32) -> (CircleRegistry, ManualClock, CircleId) {
    let clock = ManualClock::new(Timestamp::from_epoch_secs(1_767_225_600).unwrap());
    let registry =
        CircleRegistry::new(SettlementConfig::default()).with_clock(Arc::new(clock.clone()));
    let circle = registry
        .create_circle(CreateCircleParams {
            name: "prop".to_string(),
            description: String::new(),
            creator: MemberId::new("host").unwrap(),
            currency: Currency::Dai,
            frequency: PaymentFrequency::Weekly,
            capacity,
            per_round_amount: Amount(10),
            total_rounds: capacity,
            start_time: clock_now(&clock),
        })
        .unwrap();
    for name in &NAMES[..capacity as usize] {
        clock.advance_secs(1);
        registry
            .join_circle(circle.id, MemberId::new(*name).unwrap())
            .unwrap();
    }
    (registry, clock, circle.id)
}

fn clock_now(clock: &ManualClock) -> Timestamp {
    ccv_settlement::Clock::now(clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn round_counter_and_payouts_stay_consistent(
        capacity in 3u32..=4,
        ops in prop::collection::vec(op(), 1..24),
    ) {
        let (registry, clock, id) = setup(capacity);
        let mut last_round = 0;

        for op in ops {
            let current = registry.get_circle_state(id).unwrap().circle.current_round;
            match op {
                Op::Pay(i) => {
                    let name = MemberId::new(NAMES[i % capacity as usize]).unwrap();
                    let context = PaymentContext::new(id, current, name.clone());
                    let (c, _) = commit(Amount(10), Amount(10), &context, &mut OsRng).unwrap();
                    let _ = registry.record_payment(id, current, &name, c);
                }
                Op::Complete => {
                    let _ = registry.complete_round(id, current);
                }
                Op::Exclude(i) => {
                    let name = MemberId::new(NAMES[i % capacity as usize]).unwrap();
                    let _ = registry.exclude_member(id, &name, "property test");
                }
                Op::TickDays(days) => clock.advance_secs(days * 86_400),
            }

            let snapshot = registry.get_circle_state(id).unwrap();
            let circle = &snapshot.circle;
            prop_assert!(circle.current_round >= last_round);
            prop_assert!(circle.current_round <= circle.total_rounds());
            prop_assert!(circle.total_rounds() <= circle.terms.capacity);
            last_round = circle.current_round;

            // Each member is paid at most once, in distinct rounds.
            let payouts: Vec<u32> = snapshot.members.iter().filter_map(|m| m.payout_round).collect();
            let distinct: BTreeSet<u32> = payouts.iter().copied().collect();
            prop_assert_eq!(payouts.len(), distinct.len());

            let completed: Vec<_> = snapshot
                .rounds
                .iter()
                .filter(|r| r.phase == RoundPhase::Completed)
                .collect();
            // A completed circle leaves no round able to take money.
            if circle.status == CircleStatus::Completed {
                prop_assert!(snapshot.rounds.iter().all(|r| r.phase.is_terminal()));
            }

            prop_assert_eq!(completed.len(), payouts.len());
            prop_assert_eq!(completed.len() as u32, circle.current_round);
            for round in completed {
                let recipient = round.recipient.as_ref().unwrap();
                let member = snapshot
                    .members
                    .iter()
                    .find(|m| &m.member_id == recipient)
                    .unwrap();
                prop_assert_eq!(member.payout_round, Some(round.index));
                // Completed only after every member owing the round paid.
                prop_assert!(round.contributions.len() >= 1);
            }
        }
    }
}

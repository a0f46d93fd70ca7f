//! # Simulate Subcommand
//!
//! Runs one circle from creation to completion in memory: members join,
//! every round each member commits and pays, openings go to escrow, and the
//! round settles to the next recipient through a mock ledger. The clock is
//! simulated, so a year-long monthly circle finishes instantly.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::rngs::OsRng;
use serde::Serialize;

use ccv_core::{Amount, CircleId, Currency, MemberId, Timestamp};
use ccv_crypto::{commit, Ed25519KeyPair, PaymentContext};
use ccv_ledger::{
    LedgerAction, LedgerClient, LedgerConfig, MockLedgerAdapter, TransactionStatus,
};
use ccv_settlement::{CircleRegistry, CreateCircleParams, ManualClock, SettlementConfig};
use ccv_state::{PaymentFrequency, SettlementStatus};

const DAY_SECS: u64 = 86_400;

/// Arguments for `ccv simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of members; one round per member.
    #[arg(long, default_value_t = 4)]
    pub members: u32,
    /// Per-round contribution in minor units.
    #[arg(long)]
    pub amount: u64,
    /// Circle currency (USDC, ETH, DAI).
    #[arg(long, default_value = "USDC")]
    pub currency: String,
    /// Payment frequency (weekly, biweekly, monthly).
    #[arg(long, default_value = "weekly")]
    pub frequency: String,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One settled round.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedRound {
    pub round_index: u32,
    pub recipient: MemberId,
    pub pool_total: Option<Amount>,
    pub ledger_handle: String,
    pub completed_at: Timestamp,
}

/// Outcome of a simulated circle.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub circle_id: CircleId,
    pub currency: Currency,
    pub members: Vec<MemberId>,
    pub rounds: Vec<SimulatedRound>,
    /// Entries the mock ledger recorded, audits included.
    pub ledger_entries: usize,
}

/// Execute `ccv simulate`.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let currency: Currency = args
        .currency
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid currency: {e}"))?;
    let frequency: PaymentFrequency = args
        .frequency
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let report = runtime.block_on(simulate(
        args.members,
        Amount(args.amount),
        currency,
        frequency,
    ))?;

    if args.json {
        crate::write_json(&report, None)?;
        return Ok(0);
    }
    println!("circle {} ({} members, {currency})", report.circle_id, report.members.len());
    for round in &report.rounds {
        let total = round
            .pool_total
            .map(|a| a.value().to_string())
            .unwrap_or_else(|| "hidden".to_string());
        println!(
            "  round {}: {} receives {total} ({})",
            round.round_index, round.recipient, round.ledger_handle
        );
    }
    println!("OK: {} ledger entries", report.ledger_entries);
    Ok(0)
}

/// Run a full circle of `members` contributing `amount` each round.
pub async fn simulate(
    members: u32,
    amount: Amount,
    currency: Currency,
    frequency: PaymentFrequency,
) -> Result<SimulationReport> {
    let config = SettlementConfig::default();
    if members < config.min_members || members > config.max_capacity {
        bail!(
            "members must be between {} and {}, got {members}",
            config.min_members,
            config.max_capacity
        );
    }

    let clock = ManualClock::new(Timestamp::now());
    let registry = CircleRegistry::new(config).with_clock(Arc::new(clock.clone()));
    let adapter = Arc::new(MockLedgerAdapter::new());
    let ledger = LedgerClient::new(
        adapter.clone(),
        Arc::new(Ed25519KeyPair::generate()),
        LedgerConfig::fast(),
    );

    let member_ids = (1..=members)
        .map(|i| MemberId::new(format!("member-{i}")))
        .collect::<Result<Vec<_>, _>>()?;
    let circle = registry.create_circle(CreateCircleParams {
        name: "simulation".to_string(),
        description: format!("{members} members, {frequency}"),
        creator: member_ids[0].clone(),
        currency,
        frequency,
        capacity: members,
        per_round_amount: amount,
        total_rounds: members,
        start_time: registry.now(),
    })?;
    let circle_id = circle.id;
    ledger
        .submit(
            LedgerAction::CreateCircle,
            serde_json::json!({ "circle_id": circle_id.as_uuid(), "capacity": members }),
        )
        .await?;

    for member in &member_ids {
        clock.advance_secs(60);
        let outcome = registry.join_circle(circle_id, member.clone())?;
        tracing::debug!(member = %member, activated = outcome.activated, "member joined");
    }

    let mut rounds = Vec::new();
    let mut round_index = 0;
    loop {
        clock.advance_secs(DAY_SECS);
        for member in &member_ids {
            let slot = PaymentContext::new(circle_id, round_index, member.clone());
            let (contribution, opening) = commit(amount, amount, &slot, &mut OsRng)?;
            registry.record_payment(circle_id, round_index, member, contribution)?;
            registry.deposit_opening(circle_id, round_index, member, &opening)?;
        }

        let settlement = registry.complete_round(circle_id, round_index)?;
        let params = serde_json::to_value(&settlement)?;
        let (submission, status) = ledger
            .submit_and_confirm(LedgerAction::CompleteRound, params)
            .await?;
        let handle = submission.handle.to_string();
        registry.attach_settlement(circle_id, round_index, handle.clone())?;
        let status = match status {
            TransactionStatus::Failed { reason } => SettlementStatus::Failed { reason },
            _ => SettlementStatus::Confirmed,
        };
        registry.update_settlement_status(circle_id, round_index, status)?;

        rounds.push(SimulatedRound {
            round_index,
            recipient: settlement.recipient,
            pool_total: settlement.pool_total,
            ledger_handle: handle,
            completed_at: settlement.completed_at,
        });
        match settlement.next_round {
            Some(next) => round_index = next,
            None => break,
        }
    }

    tracing::info!(circle_id = %circle_id, rounds = rounds.len(), "simulation complete");
    Ok(SimulationReport {
        circle_id,
        currency,
        members: member_ids,
        rounds,
        ledger_entries: adapter.entry_count(),
    })
}

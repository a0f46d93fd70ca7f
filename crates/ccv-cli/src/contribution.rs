//! # Contribution Subcommands
//!
//! `commit`, `verify`, and `aggregate` over contribution files.
//!
//! A contribution file holds the payment slot (circle, round, member) the
//! proof is bound to, the public commitment with its range proof and, on
//! the member's own copy, the opening. Only the `contribution` part is
//! sent with a payment; the opening is deposited with escrow separately and
//! must otherwise stay with the member.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use ccv_core::{Amount, CircleId, MemberId};
use ccv_crypto::{
    aggregate, commit, verify, AggregateOpening, ContributionCommitment, ContributionOpening,
    PaymentContext,
};
use uuid::Uuid;

use crate::{read_json, write_json};

/// On-disk form of a contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionFile {
    /// Payment slot the range proof is bound to.
    pub slot: PaymentContext,
    /// Minimum the range proof was built against.
    pub minimum: Amount,
    pub contribution: ContributionCommitment,
    /// Secret opening. Absent on copies shared with others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<ContributionOpening>,
}

/// Arguments for `ccv commit`.
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Circle the payment is for.
    #[arg(long)]
    pub circle: Uuid,
    /// Round index the payment is for.
    #[arg(long)]
    pub round: u32,
    /// Paying member.
    #[arg(long)]
    pub member: String,
    /// Contributed amount in minor units.
    #[arg(long)]
    pub amount: u64,
    /// Required contribution the proof must cover.
    #[arg(long)]
    pub minimum: u64,
    /// Write the contribution file here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Arguments for `ccv verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Contribution file to check.
    #[arg(long)]
    pub file: PathBuf,
    /// Minimum the committed amount must meet.
    #[arg(long)]
    pub minimum: u64,
}

/// Arguments for `ccv aggregate`.
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Contribution files, each carrying its opening.
    #[arg(long = "file", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

/// Execute `ccv commit`.
pub fn run_commit(args: &CommitArgs) -> Result<u8> {
    let member = MemberId::new(args.member.as_str())
        .map_err(|e| anyhow::anyhow!("invalid member id: {e}"))?;
    let slot = PaymentContext::new(CircleId::from(args.circle), args.round, member);
    let file = commit_to_file(slot, Amount(args.amount), Amount(args.minimum))?;
    write_json(&file, args.out.as_deref())?;
    if let Some(out) = &args.out {
        eprintln!("OK: wrote contribution to {}", out.display());
        eprintln!("  Commitment: {}", file.contribution.commitment.to_hex());
        eprintln!("  Keep the opening secret until it is deposited with escrow.");
    }
    Ok(0)
}

/// Execute `ccv verify`.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let file: ContributionFile = read_json(&args.file)?;
    match check_contribution(&file, Amount(args.minimum)) {
        Ok(()) => {
            println!(
                "OK: contribution meets minimum {} for {} in round {}",
                args.minimum, file.slot.member_id, file.slot.round_index
            );
            Ok(0)
        }
        Err(e) => {
            println!("FAIL: {e}");
            Ok(1)
        }
    }
}

/// Execute `ccv aggregate`.
pub fn run_aggregate(args: &AggregateArgs) -> Result<u8> {
    let files = args
        .files
        .iter()
        .map(|path| read_json::<ContributionFile>(path).map(|f| (path.as_path(), f)))
        .collect::<Result<Vec<_>>>()?;
    let total = aggregate_files(&files)?;
    println!("OK: {} contributions, pool total {}", files.len(), total.value());
    Ok(0)
}

/// Commit to `amount` with a range proof against `minimum`, bound to `slot`.
pub fn commit_to_file(
    slot: PaymentContext,
    amount: Amount,
    minimum: Amount,
) -> Result<ContributionFile> {
    let (contribution, opening) =
        commit(amount, minimum, &slot, &mut OsRng).context("failed to build contribution")?;
    Ok(ContributionFile {
        slot,
        minimum,
        contribution,
        opening: Some(opening),
    })
}

/// Check the range proof against `minimum` for the file's slot, and the
/// opening if present.
pub fn check_contribution(file: &ContributionFile, minimum: Amount) -> Result<()> {
    let ContributionCommitment { commitment, proof } = &file.contribution;
    if !verify(commitment, proof, minimum, &file.slot) {
        bail!(
            "range proof does not show an amount of at least {} for {} in round {}",
            minimum.value(),
            file.slot.member_id,
            file.slot.round_index
        );
    }
    if let Some(opening) = &file.opening {
        if !opening.opens(commitment) {
            bail!("opening does not match the commitment");
        }
    }
    Ok(())
}

/// Fold every file's opening and reveal the pool total.
pub fn aggregate_files(files: &[(&Path, ContributionFile)]) -> Result<Amount> {
    let mut tally = AggregateOpening::default();
    for (path, file) in files {
        let opening = file
            .opening
            .as_ref()
            .with_context(|| format!("{} carries no opening", path.display()))?;
        tally
            .absorb(opening)
            .with_context(|| format!("failed to add {}", path.display()))?;
    }
    let total = aggregate(files.iter().map(|(_, f)| &f.contribution.commitment), &tally)
        .context("openings do not match the commitments")?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(member: &str) -> PaymentContext {
        PaymentContext::new(CircleId::from(Uuid::nil()), 0, MemberId::new(member).unwrap())
    }

    #[test]
    fn committed_file_verifies_at_its_minimum() {
        let file = commit_to_file(slot("alice"), Amount(120), Amount(100)).unwrap();
        assert!(check_contribution(&file, Amount(100)).is_ok());
        assert!(check_contribution(&file, Amount(150)).is_err());
    }

    #[test]
    fn commit_below_minimum_fails() {
        assert!(commit_to_file(slot("alice"), Amount(50), Amount(100)).is_err());
    }

    #[test]
    fn shared_copy_omits_opening() {
        let mut file = commit_to_file(slot("alice"), Amount(10), Amount(10)).unwrap();
        file.opening = None;
        let json = serde_json::to_value(&file).unwrap();
        assert!(json.get("opening").is_none());
        assert!(check_contribution(&file, Amount(10)).is_ok());
    }

    #[test]
    fn foreign_opening_is_rejected() {
        let mut a = commit_to_file(slot("alice"), Amount(10), Amount(10)).unwrap();
        let b = commit_to_file(slot("alice"), Amount(10), Amount(10)).unwrap();
        a.opening = b.opening;
        assert!(check_contribution(&a, Amount(10)).is_err());
    }

    #[test]
    fn file_moved_to_another_slot_is_rejected() {
        let mut file = commit_to_file(slot("alice"), Amount(10), Amount(10)).unwrap();
        file.slot = slot("bob");
        assert!(check_contribution(&file, Amount(10)).is_err());
        file.slot.member_id = MemberId::new("alice").unwrap();
        file.slot.round_index = 1;
        assert!(check_contribution(&file, Amount(10)).is_err());
    }

    #[test]
    fn aggregate_requires_openings() {
        let mut file = commit_to_file(slot("alice"), Amount(10), Amount(10)).unwrap();
        file.opening = None;
        let files = [(Path::new("shared.json"), file)];
        let err = aggregate_files(&files).unwrap_err();
        assert!(err.to_string().contains("shared.json"));
    }
}

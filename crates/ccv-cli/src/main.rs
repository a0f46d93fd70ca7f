//! # ccv CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ccv_cli::contribution::{
    run_aggregate, run_commit, run_verify, AggregateArgs, CommitArgs, VerifyArgs,
};
use ccv_cli::keygen::{run_keygen, KeygenArgs};
use ccv_cli::simulate::{run_simulate, SimulateArgs};

/// Circle Cipher Vault CLI
///
/// Member-side tooling for confidential contributions to lending circles,
/// operator key generation, and an in-memory circle simulator.
#[derive(Parser, Debug)]
#[command(name = "ccv", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Commit to a contribution amount with a range proof.
    Commit(CommitArgs),

    /// Verify a contribution file against a minimum amount.
    Verify(VerifyArgs),

    /// Sum contribution files and reveal the pool total.
    Aggregate(AggregateArgs),

    /// Generate an Ed25519 operator signing key.
    Keygen(KeygenArgs),

    /// Run a complete circle in memory against a mock ledger.
    Simulate(SimulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Commit(args) => run_commit(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::Aggregate(args) => run_aggregate(&args),
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Simulate(args) => run_simulate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

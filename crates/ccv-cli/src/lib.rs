//! # ccv-cli: Circle Cipher Vault Command Line
//!
//! Provides the `ccv` binary: the member-side tooling for confidential
//! contributions, plus operator utilities.
//!
//! ## Subcommands
//!
//! - `ccv commit`: commit to a contribution and prove it meets a minimum.
//! - `ccv verify`: check a contribution file's range proof.
//! - `ccv aggregate`: sum contribution files and reveal the pool total.
//! - `ccv keygen`: generate an operator signing key.
//! - `ccv simulate`: run a whole circle in memory against a mock ledger.
//!
//! ```bash
//! ccv commit --circle <id> --round 0 --member alice --amount 100 --minimum 100 --out alice.json
//! ccv verify --file alice.json --minimum 100
//! ccv aggregate --file alice.json --file bob.json
//! ```

pub mod contribution;
pub mod keygen;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read and parse a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write `value` as pretty JSON, to `path` or stdout.
pub(crate) fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    match path {
        Some(path) => std::fs::write(path, rendered + "\n")
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

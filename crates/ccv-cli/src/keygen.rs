//! # Keygen Subcommand
//!
//! Generates the operator's Ed25519 signing key. The seed is written as 64
//! hex characters, the format `ccv-api` reads from `CCV_OPERATOR_KEY`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rand::RngCore;

use ccv_crypto::{hex, Ed25519KeyPair};

/// Arguments for `ccv keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write `{prefix}.key` and `{prefix}.pub` here instead of printing.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "ccv")]
    pub prefix: String,
}

/// A freshly generated operator key.
pub struct GeneratedKey {
    pub seed_hex: String,
    pub public_hex: String,
}

/// Execute `ccv keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = generate();
    match &args.output {
        Some(dir) => {
            let (key_path, pub_path) = write_key(&key, dir, &args.prefix)?;
            println!("OK: generated Ed25519 operator key");
            println!("  Seed:       {}", key_path.display());
            println!("  Public key: {}", pub_path.display());
            println!("  Public key (hex): {}", key.public_hex);
        }
        None => {
            println!("CCV_OPERATOR_KEY={}", key.seed_hex);
            println!("public_key={}", key.public_hex);
        }
    }
    Ok(0)
}

/// Generate a random seed and derive its public key.
pub fn generate() -> GeneratedKey {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    let keypair = Ed25519KeyPair::from_seed(&seed);
    GeneratedKey {
        seed_hex: hex::encode(&seed),
        public_hex: keypair.public_key().to_hex(),
    }
}

/// Write the key pair under `dir`, returning the seed and public key paths.
pub fn write_key(key: &GeneratedKey, dir: &Path, prefix: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    let key_path = dir.join(format!("{prefix}.key"));
    let pub_path = dir.join(format!("{prefix}.pub"));
    std::fs::write(&key_path, &key.seed_hex)
        .with_context(|| format!("failed to write seed: {}", key_path.display()))?;
    std::fs::write(&pub_path, &key.public_hex)
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
    Ok((key_path, pub_path))
}

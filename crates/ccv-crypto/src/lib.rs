//! # ccv-crypto: Cryptographic Primitives
//!
//! Provides the building blocks for the contribution confidentiality layer
//! and for signing ledger intents:
//!
//! - **Pedersen commitments** over Ristretto255: `C = a·G + r·H`.
//! - **Range proofs** that a committed amount is at least a public minimum,
//!   via 64-bit decomposition and per-bit disjunctive Schnorr proofs.
//! - **Contribution API**: `commit`, `verify`, `aggregate`. Proofs are bound
//!   to a `PaymentContext`. Aggregation reveals only the pool total.
//! - **Ed25519** signing and verification over `CanonicalBytes`.
//!
//! ## Crate Policy
//!
//! - Depends only on `ccv-core` internally.
//! - No mocking of cryptographic operations in tests.
//! - No `unsafe`.

pub mod contribution;
pub mod ed25519;
pub mod error;
pub mod hex;
pub mod pedersen;
pub mod range_proof;
mod transcript;

pub use contribution::{
    aggregate, commit, verify, AggregateOpening, ContributionCommitment, ContributionOpening,
    PaymentContext,
};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CommitmentError;
pub use pedersen::{Blinding, Commitment};
pub use range_proof::RangeProof;

//! # ccv-core: Foundational Types for Circle Cipher Vault
//!
//! The leaf crate of the workspace. Every other `ccv-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CircleId`, `MemberId`,
//!    `IdempotencyKey` are distinct types with validated constructors.
//!    A member identifier can never be passed where a circle identifier is
//!    expected.
//!
//! 2. **Integer amounts only.** `Amount` wraps a `u64` in the currency's
//!    smallest unit. Floats never enter canonical representations.
//!
//! 3. **`CanonicalBytes` newtype.** All digest computation (audit digests,
//!    default idempotency keys, signed ledger intents) flows through
//!    `CanonicalBytes::new()`.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ccv-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, CcvError, CryptoError, ValidationError};
pub use identity::{CircleId, IdempotencyKey, MemberId};
pub use money::{Amount, Currency};
pub use temporal::Timestamp;

//! # Error Types
//!
//! Shared error types for the foundational layer. All errors derive
//! `Display` and `Error` through `thiserror`.
//!
//! Domain errors (circle lifecycle, payments, settlement) live in
//! `ccv-state` and `ccv-settlement`; this module only covers what the
//! primitives themselves can reject.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum CcvError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A primitive value failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use integer minor units: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A primitive value was rejected at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Member identifier is malformed.
    #[error("invalid member id {value:?}: {reason}")]
    InvalidMemberId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Idempotency key is malformed.
    #[error("invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// Currency code is not supported.
    #[error("unsupported currency {0:?}; expected one of USDC, ETH, DAI")]
    UnknownCurrency(String),

    /// Timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Arithmetic on an amount overflowed.
    #[error("amount overflow: {0}")]
    AmountOverflow(String),
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature or proof verification failed.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Encoded point, scalar or hex string is malformed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

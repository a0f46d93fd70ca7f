//! Errors raised by the confidentiality layer.

use ccv_core::{Amount, CryptoError};
use thiserror::Error;

/// Failure while committing, opening or aggregating contributions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// The amount is below the minimum the proof has to attest.
    #[error("amount is below the required minimum {minimum}")]
    BelowMinimum {
        /// The public minimum.
        minimum: Amount,
    },

    /// A commitment or proof could not be decoded.
    #[error("malformed commitment: {0}")]
    Malformed(String),

    /// The opening does not match the commitment.
    #[error("opening does not match commitment")]
    OpeningMismatch,

    /// The summed commitments do not open to the claimed aggregate.
    #[error("aggregate opening does not match {count} commitments")]
    AggregateMismatch {
        /// Number of commitments that were summed.
        count: usize,
    },

    /// The aggregate amount does not fit in 64 bits.
    #[error("aggregate amount overflow")]
    Overflow,
}

impl From<CryptoError> for CommitmentError {
    fn from(err: CryptoError) -> Self {
        Self::Malformed(err.to_string())
    }
}

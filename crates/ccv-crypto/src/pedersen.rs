//! # Pedersen Commitments over Ristretto255
//!
//! `C = a·G + r·H` where `a` is the amount in minor units and `r` a uniform
//! blinding scalar. Commitments are perfectly hiding and computationally
//! binding, and additively homomorphic:
//! `C(a₁, r₁) + C(a₂, r₂) = C(a₁ + a₂, r₁ + r₂)`.
//!
//! Both types serialize as lowercase hex of their 32-byte encodings.
//! `Blinding` is secret material: its `Debug` output is redacted.

use ccv_core::{Amount, CryptoError};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use crate::error::CommitmentError;
use crate::hex;
use crate::transcript::{blinding_generator, random_scalar, value_generator};

/// A Pedersen commitment (compressed Ristretto point).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(pub(crate) CompressedRistretto);

/// The blinding scalar of a commitment.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Blinding(pub(crate) Scalar);

impl Commitment {
    /// Commit to `amount` under `blinding`.
    pub fn new(amount: Amount, blinding: &Blinding) -> Self {
        Self::from_point(&commit_point(Scalar::from(amount.value()), blinding.0))
    }

    /// The commitment to zero with zero blinding (the group identity).
    pub fn identity() -> Self {
        Self::from_point(&RistrettoPoint::identity())
    }

    pub(crate) fn from_point(point: &RistrettoPoint) -> Self {
        Self(point.compress())
    }

    pub(crate) fn to_point(&self) -> Result<RistrettoPoint, CommitmentError> {
        self.0
            .decompress()
            .ok_or_else(|| CommitmentError::Malformed("not a valid Ristretto point".to_string()))
    }

    /// Raw 32-byte encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Parse from the raw 32-byte encoding, rejecting non-canonical points.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CommitmentError> {
        let c = Self(CompressedRistretto(bytes));
        c.to_point()?;
        Ok(c)
    }

    /// Lowercase hex of the 32-byte encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        Self::from_bytes(hex::decode_array::<32>(s)?)
    }

    /// Homomorphic sum.
    pub fn add(&self, other: &Commitment) -> Result<Commitment, CommitmentError> {
        Ok(Self::from_point(&(self.to_point()? + other.to_point()?)))
    }

    /// Homomorphic sum of many commitments. The empty sum is the identity.
    pub fn sum<'a>(
        commitments: impl IntoIterator<Item = &'a Commitment>,
    ) -> Result<Commitment, CommitmentError> {
        let mut acc = RistrettoPoint::identity();
        for c in commitments {
            acc += c.to_point()?;
        }
        Ok(Self::from_point(&acc))
    }

    /// Whether this commitment opens to `(amount, blinding)`. Compared in
    /// constant time.
    pub fn opens_to(&self, amount: Amount, blinding: &Blinding) -> bool {
        let expected = Self::new(amount, blinding);
        self.0.ct_eq(&expected.0).into()
    }
}

fn commit_point(amount: Scalar, blinding: Scalar) -> RistrettoPoint {
    amount * value_generator() + blinding * blinding_generator()
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Commitment({}...)", hex::prefix(self.0.as_bytes()))
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Blinding {
    /// Draw a uniform blinding scalar.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(random_scalar(rng))
    }

    /// The zero blinding.
    pub fn zero() -> Self {
        Self(Scalar::ZERO)
    }

    /// Sum of two blindings (mod the group order).
    pub fn add(&self, other: &Blinding) -> Blinding {
        Self(self.0 + other.0)
    }

    /// Lowercase hex of the canonical 32-byte little-endian encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Parse from hex, rejecting non-canonical scalars.
    pub fn from_hex(s: &str) -> Result<Self, CommitmentError> {
        let bytes = hex::decode_array::<32>(s)?;
        Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
            .map(Self)
            .ok_or_else(|| {
                CommitmentError::from(CryptoError::Encoding(
                    "blinding is not a canonical scalar".to_string(),
                ))
            })
    }
}

impl Serialize for Blinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Blinding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Blinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Blinding(<secret>)")
    }
}

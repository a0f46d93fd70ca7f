//! # Range Proofs: `amount ≥ minimum` without revealing `amount`
//!
//! For a commitment `C = a·G + r·H` and a public `minimum`, the prover
//! decomposes `v = a − minimum` into 64 bits `bᵢ` and commits to each bit
//! as `Cᵢ = bᵢ·G + rᵢ·H`. The bit blindings are chosen so that
//! `Σ 2ⁱ·rᵢ = r`, hence
//!
//! ```text
//! Σ 2ⁱ·Cᵢ = (a − minimum)·G + r·H = C − minimum·G
//! ```
//!
//! Each `Cᵢ` carries a Fiat–Shamir disjunctive Schnorr proof (CDS OR-proof)
//! that it opens to 0 or to 1 with respect to `H`: either `Cᵢ = rᵢ·H` or
//! `Cᵢ − G = rᵢ·H`. The challenge binds `C`, `minimum`, a caller-supplied
//! context, the bit index and both announcements. A proof built for one
//! context does not verify under another, even with the same commitment.
//!
//! Since every bit is 0 or 1, `v ∈ [0, 2⁶⁴)`, which together with the
//! decomposition equation proves `a ≥ minimum` for amounts below `2⁶⁴`.

use ccv_core::Amount;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::CommitmentError;
use crate::hex;
use crate::pedersen::{Blinding, Commitment};
use crate::transcript::{blinding_generator, random_scalar, value_generator, Transcript};

/// Number of bits in the decomposition.
pub const RANGE_BITS: usize = 64;

const RANGE_PROOF_DOMAIN: &[u8] = b"ccv/range-proof/v1";

/// Proof that a commitment opens to an amount at least some public minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    bits: Vec<BitProof>,
}

/// Commitment to one bit of `amount − minimum`, with its OR-proof.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BitProof {
    #[serde(with = "point_hex")]
    commitment: CompressedRistretto,
    #[serde(with = "scalar_hex")]
    e0: Scalar,
    #[serde(with = "scalar_hex")]
    e1: Scalar,
    #[serde(with = "scalar_hex")]
    s0: Scalar,
    #[serde(with = "scalar_hex")]
    s1: Scalar,
}

impl std::fmt::Debug for BitProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitProof({}...)", hex::prefix(self.commitment.as_bytes()))
    }
}

impl RangeProof {
    /// Commit to `amount` and prove `amount ≥ minimum` under `context`.
    ///
    /// Returns the commitment, its blinding, and the proof.
    pub fn prove<R: RngCore + CryptoRng>(
        amount: Amount,
        minimum: Amount,
        context: &[u8],
        rng: &mut R,
    ) -> Result<(Commitment, Blinding, RangeProof), CommitmentError> {
        if amount < minimum {
            return Err(CommitmentError::BelowMinimum { minimum });
        }
        let excess = amount.value() - minimum.value();

        let g = value_generator();
        let h = blinding_generator();

        let bit_blindings: Vec<Scalar> = (0..RANGE_BITS).map(|_| random_scalar(rng)).collect();
        let blinding = weighted_sum(&bit_blindings);
        let commitment = Commitment::new(amount, &Blinding(blinding));

        let mut bits = Vec::with_capacity(RANGE_BITS);
        for (i, r_i) in bit_blindings.iter().enumerate() {
            let bit = (excess >> i) & 1;
            let c_i = if bit == 1 { g + r_i * h } else { r_i * h };
            let statements = [c_i, c_i - g];
            let real = bit as usize;
            let fake = 1 - real;

            let alpha = random_scalar(rng);
            let e_fake = random_scalar(rng);
            let s_fake = random_scalar(rng);

            let mut announcements = [RistrettoPoint::identity(); 2];
            announcements[real] = alpha * h;
            announcements[fake] = s_fake * h - e_fake * statements[fake];

            let c_i = c_i.compress();
            let challenge = bit_challenge(
                &commitment.0,
                minimum,
                context,
                i,
                &c_i,
                &announcements[0].compress(),
                &announcements[1].compress(),
            );
            let e_real = challenge - e_fake;
            let s_real = alpha + e_real * r_i;

            let mut e = [Scalar::ZERO; 2];
            let mut s = [Scalar::ZERO; 2];
            e[real] = e_real;
            s[real] = s_real;
            e[fake] = e_fake;
            s[fake] = s_fake;

            bits.push(BitProof {
                commitment: c_i,
                e0: e[0],
                e1: e[1],
                s0: s[0],
                s1: s[1],
            });
        }

        Ok((commitment, Blinding(blinding), RangeProof { bits }))
    }

    /// Check that `commitment` opens to some amount `≥ minimum`, with the
    /// proof built under `context`.
    ///
    /// Learns nothing about the amount beyond that fact.
    pub fn verify(&self, commitment: &Commitment, minimum: Amount, context: &[u8]) -> bool {
        self.check(commitment, minimum, context).unwrap_or(false)
    }

    fn check(
        &self,
        commitment: &Commitment,
        minimum: Amount,
        context: &[u8],
    ) -> Result<bool, CommitmentError> {
        if self.bits.len() != RANGE_BITS {
            return Ok(false);
        }
        let g = value_generator();
        let h = blinding_generator();
        let c = commitment.to_point()?;

        let mut weighted = RistrettoPoint::identity();
        let mut weight = Scalar::ONE;
        let two = Scalar::from(2u64);

        for (i, bit) in self.bits.iter().enumerate() {
            let c_i = bit
                .commitment
                .decompress()
                .ok_or_else(|| CommitmentError::Malformed(format!("bit {i} commitment")))?;

            let a0 = bit.s0 * h - bit.e0 * c_i;
            let a1 = bit.s1 * h - bit.e1 * (c_i - g);
            let challenge = bit_challenge(
                &commitment.0,
                minimum,
                context,
                i,
                &bit.commitment,
                &a0.compress(),
                &a1.compress(),
            );
            if bit.e0 + bit.e1 != challenge {
                return Ok(false);
            }

            weighted += weight * c_i;
            weight *= two;
        }

        Ok(weighted == c - Scalar::from(minimum.value()) * g)
    }

    /// Number of bit proofs carried.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the proof carries no bit proofs (never valid).
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

fn weighted_sum(scalars: &[Scalar]) -> Scalar {
    let two = Scalar::from(2u64);
    let mut weight = Scalar::ONE;
    let mut acc = Scalar::ZERO;
    for s in scalars {
        acc += weight * s;
        weight *= two;
    }
    acc
}

fn bit_challenge(
    commitment: &CompressedRistretto,
    minimum: Amount,
    context: &[u8],
    index: usize,
    bit_commitment: &CompressedRistretto,
    a0: &CompressedRistretto,
    a1: &CompressedRistretto,
) -> Scalar {
    let mut t = Transcript::new(RANGE_PROOF_DOMAIN);
    t.append_point(commitment);
    t.append_u64(minimum.value());
    t.append_bytes(context);
    t.append_u64(index as u64);
    t.append_point(bit_commitment);
    t.append_point(a0);
    t.append_point(a1);
    t.challenge()
}

mod point_hex {
    use curve25519_dalek::ristretto::CompressedRistretto;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(p: &CompressedRistretto, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::hex::encode(p.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<CompressedRistretto, D::Error> {
        let s = String::deserialize(d)?;
        crate::hex::decode_array::<32>(&s)
            .map(CompressedRistretto)
            .map_err(serde::de::Error::custom)
    }
}

mod scalar_hex {
    use curve25519_dalek::scalar::Scalar;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(x: &Scalar, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::hex::encode(x.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Scalar, D::Error> {
        let s = String::deserialize(d)?;
        let bytes = crate::hex::decode_array::<32>(&s).map_err(serde::de::Error::custom)?;
        Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
            .ok_or_else(|| serde::de::Error::custom("non-canonical scalar"))
    }
}

//! # Contribution Confidentiality
//!
//! The member's client calls [`commit`] and keeps the returned
//! [`ContributionOpening`] secret. The settlement engine only ever sees the
//! [`ContributionCommitment`] and calls [`verify`] in place of comparing
//! amounts. Every proof is bound to a [`PaymentContext`], so a commitment
//! published in one round cannot be resubmitted for another member or round. The escrow tally accumulates openings into an
//! [`AggregateOpening`] and [`aggregate`] publishes the pool total, which is
//! the only amount ever revealed.

use ccv_core::{Amount, CircleId, MemberId};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::CommitmentError;
use crate::pedersen::{Blinding, Commitment};
use crate::range_proof::RangeProof;

/// The payment slot a contribution is made for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentContext {
    pub circle_id: CircleId,
    pub round_index: u32,
    pub member_id: MemberId,
}

impl PaymentContext {
    pub fn new(circle_id: CircleId, round_index: u32, member_id: MemberId) -> Self {
        Self {
            circle_id,
            round_index,
            member_id,
        }
    }

    /// Transcript encoding: circle uuid, little-endian round, member id.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let member = self.member_id.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(16 + 4 + member.len());
        bytes.extend_from_slice(self.circle_id.as_uuid().as_bytes());
        bytes.extend_from_slice(&self.round_index.to_le_bytes());
        bytes.extend_from_slice(member);
        bytes
    }
}

/// Public part of a contribution: the commitment and its range proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionCommitment {
    /// Pedersen commitment to the contributed amount.
    pub commitment: Commitment,
    /// Proof that the committed amount meets the required minimum.
    pub proof: RangeProof,
}

/// Member-side secret that opens a contribution commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionOpening {
    /// Contributed amount in minor units.
    pub amount: Amount,
    /// Blinding scalar.
    pub blinding: Blinding,
}

impl ContributionOpening {
    /// Whether this opening matches `commitment`.
    pub fn opens(&self, commitment: &Commitment) -> bool {
        commitment.opens_to(self.amount, &self.blinding)
    }
}

/// Running sums of contribution openings, `(Σa, Σr)`.
///
/// Holds no per-member data: individual openings are folded in and
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOpening {
    /// Sum of contributed amounts.
    pub total: Amount,
    /// Sum of blindings.
    pub blinding: Blinding,
    /// Number of openings folded in.
    pub count: u32,
}

impl Default for AggregateOpening {
    fn default() -> Self {
        Self {
            total: Amount::ZERO,
            blinding: Blinding::zero(),
            count: 0,
        }
    }
}

impl AggregateOpening {
    /// Fold one opening into the sums.
    pub fn absorb(&mut self, opening: &ContributionOpening) -> Result<(), CommitmentError> {
        let total = self
            .total
            .checked_add(opening.amount)
            .map_err(|_| CommitmentError::Overflow)?;
        self.total = total;
        self.blinding = self.blinding.add(&opening.blinding);
        self.count += 1;
        Ok(())
    }
}

/// Commit to `amount` and prove it meets `minimum` for the payment slot
/// `context`.
///
/// Fails with `BelowMinimum` if `amount < minimum`.
pub fn commit<R: RngCore + CryptoRng>(
    amount: Amount,
    minimum: Amount,
    context: &PaymentContext,
    rng: &mut R,
) -> Result<(ContributionCommitment, ContributionOpening), CommitmentError> {
    let (commitment, blinding, proof) =
        RangeProof::prove(amount, minimum, &context.to_bytes(), rng)?;
    Ok((
        ContributionCommitment { commitment, proof },
        ContributionOpening { amount, blinding },
    ))
}

/// Check that `commitment` hides an amount of at least `minimum` and that
/// the proof was built for `context`.
///
/// Returns only a boolean; the amount is never recovered.
pub fn verify(
    commitment: &Commitment,
    proof: &RangeProof,
    minimum: Amount,
    context: &PaymentContext,
) -> bool {
    proof.verify(commitment, minimum, &context.to_bytes())
}

/// Sum `commitments` homomorphically and check the sum opens to `opening`.
///
/// Returns the pool total `Σa`. Fails with `AggregateMismatch` if the
/// commitments and the aggregate opening disagree.
pub fn aggregate<'a>(
    commitments: impl IntoIterator<Item = &'a Commitment>,
    opening: &AggregateOpening,
) -> Result<Amount, CommitmentError> {
    let commitments: Vec<&Commitment> = commitments.into_iter().collect();
    let sum = Commitment::sum(commitments.iter().copied())?;
    if sum.opens_to(opening.total, &opening.blinding) {
        Ok(opening.total)
    } else {
        Err(CommitmentError::AggregateMismatch {
            count: commitments.len(),
        })
    }
}

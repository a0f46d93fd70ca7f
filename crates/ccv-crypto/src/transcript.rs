//! Fiat–Shamir challenge derivation and generator setup.

use std::sync::OnceLock;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};

const BLINDING_GENERATOR_LABEL: &[u8] = b"ccv/pedersen/blinding-generator/v1";

/// Value generator `G` (the Ristretto basepoint).
pub(crate) fn value_generator() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// Blinding generator `H`, derived by hash-to-group so nobody knows
/// `log_G(H)`.
pub(crate) fn blinding_generator() -> RistrettoPoint {
    static H: OnceLock<RistrettoPoint> = OnceLock::new();
    *H.get_or_init(|| RistrettoPoint::hash_from_bytes::<Sha512>(BLINDING_GENERATOR_LABEL))
}

/// Uniform random scalar from 64 bytes of entropy.
pub(crate) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Append-only hash transcript that reduces to a challenge scalar.
pub(crate) struct Transcript {
    hasher: Sha512,
}

impl Transcript {
    pub(crate) fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        append_framed(&mut hasher, domain);
        Self { hasher }
    }

    pub(crate) fn append_point(&mut self, point: &CompressedRistretto) {
        append_framed(&mut self.hasher, point.as_bytes());
    }

    pub(crate) fn append_u64(&mut self, value: u64) {
        append_framed(&mut self.hasher, &value.to_le_bytes());
    }

    pub(crate) fn append_bytes(&mut self, bytes: &[u8]) {
        append_framed(&mut self.hasher, bytes);
    }

    pub(crate) fn challenge(&self) -> Scalar {
        let digest = self.hasher.clone().finalize();
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&digest);
        Scalar::from_bytes_mod_order_wide(&wide)
    }
}

fn append_framed(hasher: &mut Sha512, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_distinct() {
        assert_ne!(value_generator(), blinding_generator());
    }

    #[test]
    fn blinding_generator_is_stable() {
        assert_eq!(blinding_generator(), blinding_generator());
    }

    #[test]
    fn challenge_depends_on_every_input() {
        let mut a = Transcript::new(b"test");
        a.append_u64(1);
        let mut b = Transcript::new(b"test");
        b.append_u64(2);
        assert_ne!(a.challenge(), b.challenge());
    }

    #[test]
    fn framing_prevents_concatenation_collisions() {
        let mut a = Transcript::new(b"ab");
        a.append_u64(0);
        let mut b = Transcript::new(b"a");
        b.append_u64(0);
        assert_ne!(a.challenge(), b.challenge());
    }
}

//! Pedersen commitments over Ristretto: `C = v*G + r*H`.
//!
//! `G` is the standard Ristretto basepoint. `H` is derived by hashing a
//! fixed domain tag onto the curve (Elligator2 via `hash_from_bytes`)
//! rather than computed as `k*G` for a known scalar `k` — if `H`'s
//! discrete log with respect to `G` were known, that scalar would let
//! anyone open any commitment to any value, breaking the binding
//! property the whole confidential-transfer scheme relies on.

use std::sync::OnceLock;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use sha2::Sha512;

use crate::domain::errors::PrivacyError;

const H_DOMAIN_TAG: &[u8] = b"quantum-chain/pedersen-generator-h-v1";

/// The second Pedersen generator, computed once per process.
pub fn generator_h() -> RistrettoPoint {
    static H: OnceLock<RistrettoPoint> = OnceLock::new();
    *H.get_or_init(|| RistrettoPoint::hash_from_bytes::<Sha512>(H_DOMAIN_TAG))
}

/// The Pedersen basepoint `G`, exposed for callers assembling their own
/// combinations (e.g. the range proof's per-bit verification equations).
pub fn generator_g() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// Commit to `value` with the given blinding factor.
pub fn commit(value: u64, blinding: &Scalar) -> RistrettoPoint {
    Scalar::from(value) * generator_g() + blinding * generator_h()
}

/// Commit with an arbitrary scalar value rather than a `u64`, used when
/// aggregating or negating existing commitments.
pub fn commit_scalar(value: Scalar, blinding: &Scalar) -> RistrettoPoint {
    value * generator_g() + blinding * generator_h()
}

pub fn compress(point: &RistrettoPoint) -> [u8; 32] {
    point.compress().to_bytes()
}

pub fn decompress(bytes: &[u8]) -> Result<RistrettoPoint, PrivacyError> {
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| PrivacyError::InvalidPointEncoding)?;
    CompressedRistretto(array)
        .decompress()
        .ok_or(PrivacyError::InvalidPointEncoding)
}

/// A freshly generated blinding factor, drawn from a cryptographically
/// secure RNG.
pub fn random_blinding() -> Scalar {
    Scalar::random(&mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitments_to_the_same_value_differ_with_different_blinding() {
        let r1 = random_blinding();
        let r2 = random_blinding();
        assert_ne!(compress(&commit(42, &r1)), compress(&commit(42, &r2)));
    }

    #[test]
    fn commitments_are_additively_homomorphic() {
        let r1 = random_blinding();
        let r2 = random_blinding();
        let c1 = commit(10, &r1);
        let c2 = commit(32, &r2);
        let sum = c1 + c2;
        assert_eq!(compress(&sum), compress(&commit(42, &(r1 + r2))));
    }

    #[test]
    fn generator_h_is_not_the_basepoint() {
        assert_ne!(compress(&generator_h()), compress(&generator_g()));
    }

    #[test]
    fn decompress_rejects_wrong_length_input() {
        assert!(decompress(&[0u8; 16]).is_err());
    }
}

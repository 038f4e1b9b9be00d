//! Chaum-Pedersen proofs of discrete-log equality
//!
//! A key server proves that its decryption share `u_i = x_i·u` uses the same
//! secret as its public verification key `h_i = x_i·G`, so the client can
//! discard bad shares before combining.

use crate::group::{decode_scalar, encode_point, generator, hash_to_scalar, random_scalar};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use tessera_core::Result;

const DLEQ_DOMAIN: &[u8] = b"tessera.dleq.v1";

/// Non-interactive proof that log_G(h) == log_u(v)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DleqProof {
    challenge: Scalar,
    response: Scalar,
}

fn challenge(
    h: &RistrettoPoint,
    u: &RistrettoPoint,
    v: &RistrettoPoint,
    a1: &RistrettoPoint,
    a2: &RistrettoPoint,
) -> Scalar {
    hash_to_scalar(
        DLEQ_DOMAIN,
        &[
            &encode_point(&generator()),
            &encode_point(h),
            &encode_point(u),
            &encode_point(v),
            &encode_point(a1),
            &encode_point(a2),
        ],
    )
}

impl DleqProof {
    /// Prove knowledge of `x` with `h = x·G` and `v = x·u`
    pub fn prove<R: RngCore + CryptoRng>(
        secret: &Scalar,
        u: &RistrettoPoint,
        rng: &mut R,
    ) -> Self {
        let h = RistrettoPoint::mul_base(secret);
        let v = u * secret;
        let k = random_scalar(rng);
        let a1 = RistrettoPoint::mul_base(&k);
        let a2 = u * k;
        let c = challenge(&h, u, &v, &a1, &a2);
        Self {
            challenge: c,
            response: k + c * secret,
        }
    }

    /// Check the proof for public key `h`, base `u` and claimed `v`
    pub fn verify(&self, h: &RistrettoPoint, u: &RistrettoPoint, v: &RistrettoPoint) -> bool {
        let a1 = RistrettoPoint::mul_base(&self.response) - h * self.challenge;
        let a2 = u * self.response - v * self.challenge;
        challenge(h, u, v, &a1, &a2) == self.challenge
    }

    /// 64-byte encoding: challenge ‖ response
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(self.challenge.as_bytes());
        out[32..].copy_from_slice(self.response.as_bytes());
        out
    }

    /// Decode from [`DleqProof::to_bytes`]
    pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self> {
        let mut c = [0u8; 32];
        let mut z = [0u8; 32];
        c.copy_from_slice(&bytes[..32]);
        z.copy_from_slice(&bytes[32..]);
        Ok(Self {
            challenge: decode_scalar(&c)?,
            response: decode_scalar(&z)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_valid_proof_verifies() {
        let mut rng = ChaCha20Rng::from_seed([9u8; 32]);
        let x = random_scalar(&mut rng);
        let u = RistrettoPoint::mul_base(&random_scalar(&mut rng));
        let proof = DleqProof::prove(&x, &u, &mut rng);

        let h = RistrettoPoint::mul_base(&x);
        assert!(proof.verify(&h, &u, &(u * x)));
    }

    #[test]
    fn test_wrong_share_fails() {
        let mut rng = ChaCha20Rng::from_seed([10u8; 32]);
        let x = random_scalar(&mut rng);
        let u = RistrettoPoint::mul_base(&random_scalar(&mut rng));
        let proof = DleqProof::prove(&x, &u, &mut rng);

        let h = RistrettoPoint::mul_base(&x);
        let forged = u * random_scalar(&mut rng);
        assert!(!proof.verify(&h, &u, &forged));
    }

    #[test]
    fn test_proof_bytes_roundtrip() {
        let mut rng = ChaCha20Rng::from_seed([11u8; 32]);
        let x = random_scalar(&mut rng);
        let u = RistrettoPoint::mul_base(&random_scalar(&mut rng));
        let proof = DleqProof::prove(&x, &u, &mut rng);
        assert_eq!(DleqProof::from_bytes(&proof.to_bytes()).unwrap(), proof);
    }
}

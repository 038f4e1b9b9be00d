//! Labeled threshold ElGamal key encapsulation (TDH1 style)
//!
//! Encryption needs only the committee's master public key `P = x·G` and a
//! label (the key identity). The encapsulation carries a proof that the sender
//! knows `r` with `u = r·G` and `ū = r·Ḡ`, bound to the label, so a key server
//! asked for a share under one identity cannot be tricked into decrypting a
//! header minted for another.
//!
//! Combining `t` valid shares `x_i·u` with Lagrange coefficients yields
//! `x·u = r·P`, the shared point the content key is derived from.

use crate::dleq::DleqProof;
use crate::group::{
    decode_point, decode_scalar, encode_point, hash_to_scalar, random_scalar, second_generator,
};
use crate::shamir::{index_to_scalar, LagrangeInterpolation};
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use tessera_core::{Result, TesseraError};
use zeroize::{Zeroize, ZeroizeOnDrop};

const PROOF_DOMAIN: &[u8] = b"tessera.tdh1.proof";

/// Encoded size of an [`Encapsulation`]
pub const ENCAPSULATION_LEN: usize = 128;

/// Master public key of a key-server committee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterPublicKey(pub RistrettoPoint);

impl MasterPublicKey {
    /// Compressed encoding
    pub fn to_bytes(&self) -> [u8; 32] {
        encode_point(&self.0)
    }

    /// Decode a compressed master key
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        decode_point(bytes)
            .map(Self)
            .map_err(|_| TesseraError::invalid("invalid master public key encoding"))
    }
}

/// One Shamir share of the master secret, held by a key server
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyShare {
    index: u32,
    secret: Scalar,
}

impl SecretKeyShare {
    /// Wrap a share value for index `index`
    pub fn new(index: u32, secret: Scalar) -> Self {
        Self { index, secret }
    }

    /// Restore a share from its index and canonical scalar bytes
    pub fn from_bytes(index: u32, secret: &[u8; 32]) -> Result<Self> {
        if index == 0 {
            return Err(TesseraError::invalid("share index zero is reserved"));
        }
        let secret = decode_scalar(secret)
            .map_err(|_| TesseraError::invalid("non-canonical key share"))?;
        Ok(Self { index, secret })
    }

    /// Canonical scalar bytes of the share
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Share index (x coordinate, never zero)
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Public verification key `x_i·G`
    pub fn verification_key(&self) -> RistrettoPoint {
        RistrettoPoint::mul_base(&self.secret)
    }

    /// Produce this share's contribution to decrypting `encapsulation`.
    ///
    /// The caller must have checked the encapsulation under its label first.
    pub fn decryption_share<R: RngCore + CryptoRng>(
        &self,
        encapsulation: &Encapsulation,
        rng: &mut R,
    ) -> DecryptionShare {
        DecryptionShare {
            index: self.index,
            point: encapsulation.u * self.secret,
            proof: DleqProof::prove(&self.secret, &encapsulation.u, rng),
        }
    }
}

impl std::fmt::Debug for SecretKeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKeyShare")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Ciphertext header binding an ephemeral randomness to a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encapsulation {
    u: RistrettoPoint,
    u_bar: RistrettoPoint,
    e: Scalar,
    f: Scalar,
}

fn proof_challenge(
    label: &[u8],
    u: &RistrettoPoint,
    u_bar: &RistrettoPoint,
    w: &RistrettoPoint,
    w_bar: &RistrettoPoint,
) -> Scalar {
    hash_to_scalar(
        PROOF_DOMAIN,
        &[
            label,
            &encode_point(u),
            &encode_point(u_bar),
            &encode_point(w),
            &encode_point(w_bar),
        ],
    )
}

impl Encapsulation {
    /// Encapsulate a fresh shared point under `label`.
    ///
    /// Returns the header and `r·P`.
    pub fn new<R: RngCore + CryptoRng>(
        master: &MasterPublicKey,
        label: &[u8],
        rng: &mut R,
    ) -> (Self, RistrettoPoint) {
        let g_bar = second_generator();
        let r = random_scalar(rng);
        let s = random_scalar(rng);

        let u = RistrettoPoint::mul_base(&r);
        let u_bar = g_bar * r;
        let w = RistrettoPoint::mul_base(&s);
        let w_bar = g_bar * s;
        let e = proof_challenge(label, &u, &u_bar, &w, &w_bar);
        let f = s + r * e;

        (Self { u, u_bar, e, f }, master.0 * r)
    }

    /// Check the well-formedness proof against `label`
    pub fn verify(&self, label: &[u8]) -> bool {
        let w = RistrettoPoint::mul_base(&self.f) - self.u * self.e;
        let w_bar = second_generator() * self.f - self.u_bar * self.e;
        proof_challenge(label, &self.u, &self.u_bar, &w, &w_bar) == self.e
    }

    /// Ephemeral point `u = r·G`
    pub fn u(&self) -> &RistrettoPoint {
        &self.u
    }

    /// Fixed-size encoding: u ‖ ū ‖ e ‖ f
    pub fn to_bytes(&self) -> [u8; ENCAPSULATION_LEN] {
        let mut out = [0u8; ENCAPSULATION_LEN];
        out[0..32].copy_from_slice(&encode_point(&self.u));
        out[32..64].copy_from_slice(&encode_point(&self.u_bar));
        out[64..96].copy_from_slice(self.e.as_bytes());
        out[96..128].copy_from_slice(self.f.as_bytes());
        out
    }

    /// Decode from [`Encapsulation::to_bytes`]
    pub fn from_bytes(bytes: &[u8; ENCAPSULATION_LEN]) -> Result<Self> {
        let chunk = |i: usize| -> [u8; 32] {
            let mut out = [0u8; 32];
            out.copy_from_slice(&bytes[i * 32..(i + 1) * 32]);
            out
        };
        Ok(Self {
            u: decode_point(&chunk(0))?,
            u_bar: decode_point(&chunk(1))?,
            e: decode_scalar(&chunk(2))?,
            f: decode_scalar(&chunk(3))?,
        })
    }
}

/// A key server's verifiable contribution `x_i·u`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionShare {
    /// Share index of the producing key
    pub index: u32,
    /// `x_i·u`
    pub point: RistrettoPoint,
    /// Proof that `point` matches the verification key of `index`
    pub proof: DleqProof,
}

impl DecryptionShare {
    /// Check the share against its verification key and the header it answers
    pub fn verify(&self, verification_key: &RistrettoPoint, encapsulation: &Encapsulation) -> bool {
        self.proof
            .verify(verification_key, &encapsulation.u, &self.point)
    }
}

/// Combine shares with distinct indices into the shared point.
///
/// Exactly the supplied shares are used; callers pass at least `t` verified
/// shares (extra shares are harmless).
pub fn combine_shares(shares: &[DecryptionShare]) -> Result<RistrettoPoint> {
    if shares.is_empty() {
        return Err(TesseraError::access_denied("no decryption shares to combine"));
    }
    let xs: Vec<Scalar> = shares.iter().map(|s| index_to_scalar(s.index)).collect();
    let lambdas = LagrangeInterpolation::coefficients_at_zero(&xs)?;
    Ok(shares
        .iter()
        .zip(lambdas)
        .map(|(share, lambda)| share.point * lambda)
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shamir::ShamirPolynomial;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn committee(threshold: usize, total: u32, rng: &mut ChaCha20Rng) -> (MasterPublicKey, Vec<SecretKeyShare>) {
        let secret = random_scalar(rng);
        let poly = ShamirPolynomial::from_secret(secret, threshold, rng).unwrap();
        let shares = (1..=total)
            .map(|i| SecretKeyShare::new(i, poly.share(i).y))
            .collect();
        (MasterPublicKey(RistrettoPoint::mul_base(&secret)), shares)
    }

    #[test]
    fn test_threshold_shares_recover_shared_point() {
        let mut rng = ChaCha20Rng::from_seed([20u8; 32]);
        let (master, keys) = committee(2, 3, &mut rng);
        let (header, shared) = Encapsulation::new(&master, b"label", &mut rng);

        let shares: Vec<_> = keys[1..]
            .iter()
            .map(|k| k.decryption_share(&header, &mut rng))
            .collect();
        for (share, key) in shares.iter().zip(&keys[1..]) {
            assert!(share.verify(&key.verification_key(), &header));
        }
        assert_eq!(combine_shares(&shares).unwrap(), shared);
        assert_ne!(combine_shares(&shares[..1]).unwrap(), shared);
    }

    #[test]
    fn test_label_binding() {
        let mut rng = ChaCha20Rng::from_seed([21u8; 32]);
        let (master, _) = committee(1, 1, &mut rng);
        let (header, _) = Encapsulation::new(&master, b"policy-a", &mut rng);
        assert!(header.verify(b"policy-a"));
        assert!(!header.verify(b"policy-b"));
    }

    #[test]
    fn test_share_from_wrong_key_is_rejected() {
        let mut rng = ChaCha20Rng::from_seed([22u8; 32]);
        let (master, keys) = committee(2, 3, &mut rng);
        let (header, _) = Encapsulation::new(&master, b"label", &mut rng);
        let share = keys[0].decryption_share(&header, &mut rng);
        assert!(!share.verify(&keys[1].verification_key(), &header));
    }

    #[test]
    fn test_encapsulation_bytes_roundtrip() {
        let mut rng = ChaCha20Rng::from_seed([23u8; 32]);
        let (master, _) = committee(1, 1, &mut rng);
        let (header, _) = Encapsulation::new(&master, b"label", &mut rng);
        let decoded = Encapsulation::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(decoded, header);
        assert!(decoded.verify(b"label"));
    }
}

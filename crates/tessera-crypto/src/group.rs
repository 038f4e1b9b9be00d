//! Ristretto255 group helpers
//!
//! Hash-to-scalar, hash-to-point, fixed generators, random sampling and the
//! 32-byte encodings used on the wire.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use sha2::{Digest, Sha512};
use std::sync::OnceLock;
use tessera_core::{Result, TesseraError};

/// Domain tag of the second generator used by ciphertext validity proofs
const G_BAR_DOMAIN: &[u8] = b"tessera.tdh1.gbar";

/// Standard Ristretto basepoint `G`
pub fn generator() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// Independent generator `Ḡ` with unknown discrete log relative to `G`
pub fn second_generator() -> RistrettoPoint {
    static G_BAR: OnceLock<RistrettoPoint> = OnceLock::new();
    *G_BAR.get_or_init(|| hash_to_point(G_BAR_DOMAIN, &[]))
}

fn wide_digest(domain: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain);
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hash length-framed parts to a scalar under a domain tag
pub fn hash_to_scalar(domain: &[u8], parts: &[&[u8]]) -> Scalar {
    Scalar::from_bytes_mod_order_wide(&wide_digest(domain, parts))
}

/// Hash length-framed parts to a group element under a domain tag
pub fn hash_to_point(domain: &[u8], parts: &[&[u8]]) -> RistrettoPoint {
    RistrettoPoint::from_uniform_bytes(&wide_digest(domain, parts))
}

/// Sample a uniformly random scalar
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// CSPRNG for scalar sampling, seeded from effect-provided randomness
pub fn rng_from_seed(seed: [u8; 32]) -> ChaCha20Rng {
    ChaCha20Rng::from_seed(seed)
}

/// Compressed 32-byte encoding of a point
pub fn encode_point(point: &RistrettoPoint) -> [u8; 32] {
    point.compress().to_bytes()
}

/// Decode a compressed point, rejecting non-canonical encodings
pub fn decode_point(bytes: &[u8; 32]) -> Result<RistrettoPoint> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or_else(|| TesseraError::corrupt_ciphertext("invalid group element encoding"))
}

/// Decode a canonical scalar
pub fn decode_scalar(bytes: &[u8; 32]) -> Result<Scalar> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
        .ok_or_else(|| TesseraError::corrupt_ciphertext("non-canonical scalar encoding"))
}

/// Serde helpers rendering 32-byte values as hex strings
pub mod serde_hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as lowercase hex
    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserialize from hex
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(text.trim_start_matches("0x"), &mut out)
            .map_err(serde::de::Error::custom)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_second_generator_is_independent_of_basepoint() {
        assert_ne!(second_generator(), generator());
        assert_eq!(second_generator(), second_generator());
    }

    #[test]
    fn test_point_encoding_roundtrip() {
        let mut rng = ChaCha20Rng::from_seed([3u8; 32]);
        let point = RistrettoPoint::mul_base(&random_scalar(&mut rng));
        assert_eq!(decode_point(&encode_point(&point)).unwrap(), point);
    }

    #[test]
    fn test_invalid_point_is_corrupt_ciphertext() {
        let err = decode_point(&[0xff; 32]).unwrap_err();
        assert_eq!(err.kind(), tessera_core::ErrorKind::CorruptCiphertext);
    }

    #[test]
    fn test_hex32_serde() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper(#[serde(with = "serde_hex32")] [u8; 32]);

        let json = serde_json::to_string(&Wrapper([0xab; 32])).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.0, [0xab; 32]);
    }

    #[test]
    fn test_hash_to_scalar_is_framed() {
        let a = hash_to_scalar(b"d", &[b"ab", b"c"]);
        let b = hash_to_scalar(b"d", &[b"a", b"bc"]);
        assert_ne!(a, b);
    }
}

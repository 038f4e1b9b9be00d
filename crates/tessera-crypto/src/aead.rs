//! Payload sealing with AES-256-GCM
//!
//! The content key is derived with HKDF-SHA256 from the encapsulated shared
//! point, bound to the key identity and the ephemeral point. The serialized
//! ciphertext header is passed as associated data, so any change to the
//! header (committee, threshold, identity) breaks authentication.

use crate::group::encode_point;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use curve25519_dalek::ristretto::RistrettoPoint;
use hkdf::Hkdf;
use sha2::Sha256;
use tessera_core::{Result, TesseraError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;

const KDF_SALT: &[u8] = b"tessera.dem.v1";

/// Symmetric key protecting one payload
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Derive the content key for a shared point, label and ephemeral point
    pub fn derive(shared: &RistrettoPoint, label: &[u8], u: &RistrettoPoint) -> Result<Self> {
        let ikm = encode_point(shared);
        let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), &ikm);
        let mut info = Vec::with_capacity(label.len() + 32);
        info.extend_from_slice(label);
        info.extend_from_slice(&encode_point(u));

        let mut okm = [0u8; 32];
        hk.expand(&info, &mut okm)
            .map_err(|e| TesseraError::internal(format!("HKDF expand failed: {e}")))?;
        Ok(Self(okm))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }

    /// Encrypt `plaintext` authenticating `aad`
    pub fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
            .map_err(|e| TesseraError::encryption(format!("AES-GCM encryption failed: {e}")))
    }

    /// Decrypt and authenticate; any mismatch is reported as corrupt ciphertext
    pub fn open(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| TesseraError::corrupt_ciphertext("payload authentication failed"))
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

//! Storage write signing
//!
//! The signing capability is picked once from configuration:
//! `ServerManaged` builds a signer from the configured storage key,
//! `UserManaged` uses a signer supplied by the embedding application.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::fmt;
use std::sync::Arc;
use tessera_core::hash::Hasher;
use tessera_core::{BlobId, PrincipalId, Result, SigningConfig, TesseraError};

const WRITE_DOMAIN: &[u8] = b"tessera.storage.write";

/// Key able to authorize storage-network transactions
pub trait StorageSigner: Send + Sync {
    /// Ed25519 public key
    fn public_key(&self) -> [u8; 32];

    /// Sign a storage transaction digest
    fn sign(&self, message: &[u8]) -> [u8; 64];

    /// Storage-network address of this signer
    fn address(&self) -> PrincipalId {
        PrincipalId::from_ed25519_public_key(&self.public_key())
    }
}

/// Signer backed by an in-process Ed25519 key
pub struct Ed25519StorageSigner {
    key: SigningKey,
}

impl Ed25519StorageSigner {
    /// Wrap a secret key
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }
}

impl StorageSigner for Ed25519StorageSigner {
    fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Ed25519StorageSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519StorageSigner({})", self.address())
    }
}

/// Source of the storage signing capability
#[derive(Clone)]
pub enum SigningStrategy {
    /// The service signs with its own configured key
    ServerManaged(Arc<dyn StorageSigner>),
    /// The embedding application provides the signer
    UserManaged(Arc<dyn StorageSigner>),
}

impl SigningStrategy {
    /// Resolve the strategy from configuration.
    ///
    /// `user_signer` is required in user-managed mode and ignored otherwise.
    pub fn from_config(
        config: &SigningConfig,
        user_signer: Option<Arc<dyn StorageSigner>>,
    ) -> Result<Self> {
        match config.server_secret_key()? {
            Some(secret) => Ok(Self::ServerManaged(Arc::new(
                Ed25519StorageSigner::from_secret(&secret),
            ))),
            None => user_signer.map(Self::UserManaged).ok_or_else(|| {
                TesseraError::invalid("user-managed storage signing requires a signer")
            }),
        }
    }

    /// The signer writes go through
    pub fn signer(&self) -> &dyn StorageSigner {
        match self {
            Self::ServerManaged(signer) | Self::UserManaged(signer) => signer.as_ref(),
        }
    }

    /// Mode name for logs
    pub fn mode(&self) -> &'static str {
        match self {
            Self::ServerManaged(_) => "server_managed",
            Self::UserManaged(_) => "user_managed",
        }
    }
}

impl fmt::Debug for SigningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningStrategy::{}({})", self.mode(), self.signer().address())
    }
}

/// Digest a storage write authorization covers
pub fn write_digest(blob_id: &BlobId, epochs: u32, deletable: bool) -> [u8; 32] {
    let mut hasher = Hasher::with_domain(WRITE_DOMAIN);
    hasher
        .update_framed(blob_id.as_str().as_bytes())
        .update_framed(&epochs.to_be_bytes())
        .update_framed(&[u8::from(deletable)]);
    hasher.finalize()
}

/// Check a write signature against the signer's public key
pub fn verify_write(public_key: &[u8; 32], digest: &[u8; 32], signature: &[u8; 64]) -> Result<()> {
    let key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| TesseraError::storage_write(format!("bad storage signer key: {e}")))?;
    key.verify(digest, &Signature::from_bytes(signature))
        .map_err(|_| TesseraError::invalid_signature("storage write signature"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    #[test]
    fn test_server_managed_from_config() {
        let config = SigningConfig::ServerManaged {
            keypair: STANDARD.encode([9u8; 32]),
        };
        let strategy = SigningStrategy::from_config(&config, None).unwrap();
        assert_eq!(strategy.mode(), "server_managed");
        assert_eq!(
            strategy.signer().public_key(),
            Ed25519StorageSigner::from_secret(&[9u8; 32]).public_key()
        );
    }

    #[test]
    fn test_user_managed_requires_signer() {
        assert!(SigningStrategy::from_config(&SigningConfig::UserManaged, None).is_err());
        let signer: Arc<dyn StorageSigner> = Arc::new(Ed25519StorageSigner::from_secret(&[1u8; 32]));
        let strategy = SigningStrategy::from_config(&SigningConfig::UserManaged, Some(signer)).unwrap();
        assert_eq!(strategy.mode(), "user_managed");
    }

    #[test]
    fn test_write_signature_verifies() {
        let signer = Ed25519StorageSigner::from_secret(&[2u8; 32]);
        let blob = BlobId::for_content(b"bytes");
        let digest = write_digest(&blob, 3, false);
        let sig = signer.sign(&digest);
        verify_write(&signer.public_key(), &digest, &sig).unwrap();
        let other = write_digest(&blob, 4, false);
        assert!(verify_write(&signer.public_key(), &other, &sig).is_err());
    }
}

//! Named principals with deterministic keys

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use tessera_core::hash::hash;
use tessera_core::PrincipalId;

/// A test principal
#[derive(Debug, Clone)]
pub struct Principal {
    /// Display name
    pub name: String,
    /// Ed25519 key, derived from the name
    pub key: SigningKey,
    /// Ledger address of `key`
    pub id: PrincipalId,
}

impl Principal {
    /// The same name always yields the same key
    pub fn named(name: &str) -> Self {
        let key = SigningKey::from_bytes(&hash(format!("principal:{name}").as_bytes()));
        let id = PrincipalId::from_ed25519_public_key(key.verifying_key().as_bytes());
        Self {
            name: name.to_string(),
            key,
            id,
        }
    }

    /// Public half of the key
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Sign a session challenge
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.key.sign(message)
    }
}

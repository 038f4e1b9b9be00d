//! Principal public-key directory

use ed25519_dalek::VerifyingKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use tessera_core::PrincipalId;

/// Lookup of a principal's signature-verification key
pub trait PrincipalDirectory: Send + Sync {
    /// Known public key for `principal`, if any
    fn public_key(&self, principal: &PrincipalId) -> Option<VerifyingKey>;
}

/// Directory populated in process, keyed by the address derived from each key
#[derive(Debug, Default)]
pub struct MemoryPrincipalDirectory {
    keys: RwLock<HashMap<PrincipalId, VerifyingKey>>,
}

impl MemoryPrincipalDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key and return the principal address it maps to
    pub fn register(&self, key: VerifyingKey) -> PrincipalId {
        let principal = PrincipalId::from_ed25519_public_key(key.as_bytes());
        self.keys.write().insert(principal, key);
        principal
    }
}

impl PrincipalDirectory for MemoryPrincipalDirectory {
    fn public_key(&self, principal: &PrincipalId) -> Option<VerifyingKey> {
        self.keys.read().get(principal).copied()
    }
}

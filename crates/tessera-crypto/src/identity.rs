//! Key identities
//!
//! A key identity is the label a payload is encrypted under: the policy id
//! followed by a random nonce, so every stored secret gets its own key while
//! key servers can still read the governing policy off the prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{PolicyId, Result, TesseraError};

/// Length of the random nonce appended to the policy id
pub const KEY_NONCE_LEN: usize = 8;

/// `policy_id ‖ nonce`
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct KeyIdentity(Vec<u8>);

impl KeyIdentity {
    /// Build an identity from a policy and a fresh nonce
    pub fn new(policy_id: &PolicyId, nonce: [u8; KEY_NONCE_LEN]) -> Self {
        let mut bytes = Vec::with_capacity(32 + KEY_NONCE_LEN);
        bytes.extend_from_slice(policy_id.as_bytes());
        bytes.extend_from_slice(&nonce);
        Self(bytes)
    }

    /// Parse raw identity bytes; longer nonces are accepted
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 32 + KEY_NONCE_LEN {
            return Err(TesseraError::invalid(format!(
                "key identity must be at least {} bytes, got {}",
                32 + KEY_NONCE_LEN,
                bytes.len()
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Policy this identity is governed by
    pub fn policy_id(&self) -> PolicyId {
        let mut prefix = [0u8; 32];
        prefix.copy_from_slice(&self.0[..32]);
        PolicyId::from_bytes(prefix)
    }

    /// Whether the identity's prefix names `policy_id`
    pub fn is_governed_by(&self, policy_id: &PolicyId) -> bool {
        self.0[..32] == policy_id.as_bytes()[..]
    }

    /// Nonce suffix
    pub fn nonce(&self) -> &[u8] {
        &self.0[32..]
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering used in receipts and logs
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from [`KeyIdentity::to_hex`]
    pub fn from_hex(text: &str) -> Result<Self> {
        let raw = hex::decode(text.trim_start_matches("0x"))
            .map_err(|e| TesseraError::invalid(format!("invalid key identity hex: {e}")))?;
        Self::from_bytes(&raw)
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyIdentity({})", self.to_hex())
    }
}

impl From<KeyIdentity> for String {
    fn from(id: KeyIdentity) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for KeyIdentity {
    type Error = TesseraError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_policy() {
        let policy = PolicyId::derive(b"team");
        let id = KeyIdentity::new(&policy, [7u8; KEY_NONCE_LEN]);
        assert_eq!(id.policy_id(), policy);
        assert!(id.is_governed_by(&policy));
        assert!(!id.is_governed_by(&PolicyId::derive(b"other")));
        assert_eq!(id.nonce(), &[7u8; KEY_NONCE_LEN]);
    }

    #[test]
    fn test_hex_roundtrip_and_length_check() {
        let id = KeyIdentity::new(&PolicyId::derive(b"p"), [1u8; KEY_NONCE_LEN]);
        assert_eq!(KeyIdentity::from_hex(&id.to_hex()).unwrap(), id);
        assert!(KeyIdentity::from_bytes(&[0u8; 39]).is_err());
    }
}

//! Approval transaction payload
//!
//! The payload a client hands to key servers alongside a share request. A key
//! server decodes it and dry-runs it against current policy state; it is
//! never submitted for execution.

use serde::{Deserialize, Serialize};
use tessera_core::{PackageId, PolicyId, Result, TesseraError};
use tessera_crypto::KeyIdentity;

/// Request to approve decryption of `key_identity` under `policy_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTransaction {
    /// Package whose approval logic is invoked
    pub package_id: PackageId,
    /// Policy object passed to the approval call
    pub policy_id: PolicyId,
    /// Identity the caller wants decrypted
    pub key_identity: KeyIdentity,
}

impl ApprovalTransaction {
    /// Build the approval for a ciphertext's identity
    pub fn new(package_id: PackageId, policy_id: PolicyId, key_identity: KeyIdentity) -> Self {
        Self {
            package_id,
            policy_id,
            key_identity,
        }
    }

    /// Encode for transport
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| TesseraError::internal(format!("encode approval transaction: {e}")))
    }

    /// Decode a transported payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| TesseraError::invalid(format!("malformed approval transaction: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let policy = PolicyId::derive(b"p");
        let tx = ApprovalTransaction::new(
            PackageId::derive(b"pkg"),
            policy,
            KeyIdentity::new(&policy, [1u8; 8]),
        );
        assert_eq!(ApprovalTransaction::from_bytes(&tx.to_bytes().unwrap()).unwrap(), tx);
        assert!(ApprovalTransaction::from_bytes(b"junk").is_err());
    }
}

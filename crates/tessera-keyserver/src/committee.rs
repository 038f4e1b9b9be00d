//! Committee descriptors and dealer key generation
//!
//! The descriptor is the public half of a committee: threshold, master public
//! key and, per server, its weight and share verification keys. Clients need
//! only the descriptor to encrypt and to verify shares. Each server's secret
//! material is kept in a separate [`KeyServerSecret`].

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tessera_core::{KeyServerEntry, KeyServerId, Result, TesseraError};
use tessera_crypto::group::{decode_point, encode_point, serde_hex32};
use tessera_crypto::{
    deal, indices_for, EncryptedObject, KeyServerRef, MasterPublicKey, RistrettoPoint,
    SecretKeyShare,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public verification key of one share index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    /// Share index
    pub index: u32,
    /// `x_i·G`, compressed
    #[serde(with = "serde_hex32")]
    pub key: [u8; 32],
}

/// Public description of one committee member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMember {
    /// Key server id
    pub id: KeyServerId,
    /// Number of share indices held
    pub weight: u8,
    /// Endpoint, when remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Verification keys of the held indices, ascending
    pub verification_keys: Vec<VerificationKey>,
}

/// Public parameters of a key-server committee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeDescriptor {
    /// Share indices required to decrypt
    pub threshold: u16,
    /// Master public key, compressed
    #[serde(with = "serde_hex32")]
    pub master_public_key: [u8; 32],
    /// Members in share-index order
    pub members: Vec<CommitteeMember>,
}

impl CommitteeDescriptor {
    /// Decoded master public key
    pub fn master(&self) -> Result<MasterPublicKey> {
        MasterPublicKey::from_bytes(&self.master_public_key)
    }

    /// Members as recorded in ciphertext headers
    pub fn key_server_refs(&self) -> Vec<KeyServerRef> {
        self.members
            .iter()
            .map(|m| KeyServerRef {
                id: m.id,
                weight: m.weight,
            })
            .collect()
    }

    /// Sum of member weights
    pub fn total_weight(&self) -> u32 {
        self.members.iter().map(|m| u32::from(m.weight)).sum()
    }

    /// Look up a member
    pub fn member(&self, id: &KeyServerId) -> Option<&CommitteeMember> {
        self.members.iter().find(|m| m.id == *id)
    }

    /// Verification key for `index`, only if `server` holds that index
    pub fn verification_key(&self, server: &KeyServerId, index: u32) -> Option<RistrettoPoint> {
        self.member(server)?
            .verification_keys
            .iter()
            .find(|vk| vk.index == index)
            .and_then(|vk| decode_point(&vk.key).ok())
    }

    /// Whether a ciphertext was encrypted to exactly this committee
    pub fn matches(&self, object: &EncryptedObject) -> bool {
        object.threshold == self.threshold && object.key_servers == self.key_server_refs()
    }

    /// Check structural consistency
    pub fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(TesseraError::invalid("committee has no members"));
        }
        let total = self.total_weight();
        if self.threshold == 0 || u32::from(self.threshold) > total {
            return Err(TesseraError::invalid(format!(
                "threshold {} must be in 1..={total}",
                self.threshold
            )));
        }
        self.master()?;

        let weights: Vec<u8> = self.members.iter().map(|m| m.weight).collect();
        let mut ids = HashSet::new();
        for (position, member) in self.members.iter().enumerate() {
            if !ids.insert(member.id) {
                return Err(TesseraError::invalid(format!("duplicate key server {}", member.id)));
            }
            if member.weight == 0 {
                return Err(TesseraError::invalid(format!("key server {} has weight 0", member.id)));
            }
            let expected: Vec<u32> = indices_for(&weights, position).collect();
            let actual: Vec<u32> = member.verification_keys.iter().map(|vk| vk.index).collect();
            if expected != actual {
                return Err(TesseraError::invalid(format!(
                    "key server {} must hold indices {expected:?}, descriptor lists {actual:?}",
                    member.id
                )));
            }
            for vk in &member.verification_keys {
                decode_point(&vk.key).map_err(|_| {
                    TesseraError::invalid(format!("bad verification key for index {}", vk.index))
                })?;
            }
        }
        Ok(())
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TesseraError::internal(format!("encode committee: {e}")))
    }

    /// Parse and validate JSON
    pub fn from_json(text: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(text)
            .map_err(|e| TesseraError::invalid(format!("malformed committee descriptor: {e}")))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// One share's secret scalar
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ShareSecret {
    /// Share index
    pub index: u32,
    /// Canonical scalar bytes
    #[serde(with = "serde_hex32")]
    pub secret: [u8; 32],
}

/// Secret material of one key server
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyServerSecret {
    /// Server this material belongs to
    pub id: KeyServerId,
    /// Held shares
    pub shares: Vec<ShareSecret>,
}

impl KeyServerSecret {
    /// Decode into usable key shares
    pub fn key_shares(&self) -> Result<Vec<SecretKeyShare>> {
        self.shares
            .iter()
            .map(|s| SecretKeyShare::from_bytes(s.index, &s.secret))
            .collect()
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TesseraError::internal(format!("encode key server secret: {e}")))
    }

    /// Parse JSON
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| TesseraError::invalid(format!("malformed key server secret: {e}")))
    }
}

impl fmt::Debug for KeyServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<u32> = self.shares.iter().map(|s| s.index).collect();
        f.debug_struct("KeyServerSecret")
            .field("id", &self.id)
            .field("indices", &indices)
            .finish_non_exhaustive()
    }
}

/// Deal a fresh committee for the given members
pub fn generate_committee<R: RngCore + CryptoRng>(
    threshold: u16,
    entries: &[KeyServerEntry],
    rng: &mut R,
) -> Result<(CommitteeDescriptor, Vec<KeyServerSecret>)> {
    let weights: Vec<u8> = entries.iter().map(|e| e.weight).collect();
    let dealt = deal(threshold, &weights, rng)?;

    let mut members = Vec::with_capacity(entries.len());
    let mut secrets = Vec::with_capacity(entries.len());
    for (entry, shares) in entries.iter().zip(&dealt.server_shares) {
        members.push(CommitteeMember {
            id: entry.id,
            weight: entry.weight,
            url: entry.url.clone(),
            verification_keys: shares
                .iter()
                .map(|s| VerificationKey {
                    index: s.index(),
                    key: encode_point(&s.verification_key()),
                })
                .collect(),
        });
        secrets.push(KeyServerSecret {
            id: entry.id,
            shares: shares
                .iter()
                .map(|s| ShareSecret {
                    index: s.index(),
                    secret: s.secret_bytes(),
                })
                .collect(),
        });
    }

    let descriptor = CommitteeDescriptor {
        threshold,
        master_public_key: dealt.master.to_bytes(),
        members,
    };
    descriptor.validate()?;
    Ok((descriptor, secrets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_crypto::rng_from_seed;

    fn entries(weights: &[u8]) -> Vec<KeyServerEntry> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| KeyServerEntry {
                id: KeyServerId::derive(format!("ks-{i}").as_bytes()),
                weight: *w,
                url: None,
            })
            .collect()
    }

    #[test]
    fn test_generated_committee_is_consistent() {
        let mut rng = rng_from_seed([1u8; 32]);
        let (descriptor, secrets) = generate_committee(3, &entries(&[2, 1, 1]), &mut rng).unwrap();
        assert_eq!(descriptor.total_weight(), 4);
        assert_eq!(secrets.len(), 3);

        for (member, secret) in descriptor.members.iter().zip(&secrets) {
            for share in secret.key_shares().unwrap() {
                assert_eq!(
                    descriptor.verification_key(&member.id, share.index()),
                    Some(share.verification_key())
                );
            }
        }
        // Index 3 belongs to the second server only
        assert!(descriptor.verification_key(&descriptor.members[0].id, 3).is_none());
    }

    #[test]
    fn test_descriptor_json_roundtrip() {
        let mut rng = rng_from_seed([2u8; 32]);
        let (descriptor, secrets) = generate_committee(2, &entries(&[1, 1, 1]), &mut rng).unwrap();
        let parsed = CommitteeDescriptor::from_json(&descriptor.to_json().unwrap()).unwrap();
        assert_eq!(parsed, descriptor);

        let secret = KeyServerSecret::from_json(&secrets[0].to_json().unwrap()).unwrap();
        assert_eq!(secret.key_shares().unwrap()[0].index(), 1);
        assert!(!format!("{secret:?}").contains("secret:"));
    }

    #[test]
    fn test_tampered_descriptor_rejected() {
        let mut rng = rng_from_seed([3u8; 32]);
        let (mut descriptor, _) = generate_committee(2, &entries(&[1, 1, 1]), &mut rng).unwrap();
        descriptor.members[1].verification_keys[0].index = 7;
        assert!(descriptor.validate().is_err());

        descriptor.members[1].verification_keys[0].index = 2;
        descriptor.threshold = 4;
        assert!(descriptor.validate().is_err());
    }
}

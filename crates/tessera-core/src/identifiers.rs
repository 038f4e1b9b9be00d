//! Core identifier types
//!
//! Ledger objects (policies, packages, principals, key servers, blob
//! registrations) are addressed by 32-byte ids rendered as `0x`-prefixed
//! lowercase hex. Blobs are addressed by the URL-safe base64 of their content
//! hash. Session handles are process-local UUIDs.

use crate::hash::{self, Hasher};
use crate::{Result, TesseraError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Parse a `0x`-prefixed (or bare) hex string into 32 bytes.
///
/// Short ids are left-padded with zeros, matching ledger address semantics
/// where `0x2` names the same object as `0x000…02`.
pub fn parse_object_bytes(input: &str) -> Result<[u8; 32]> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.is_empty() || digits.len() > 64 {
        return Err(TesseraError::invalid(format!(
            "object id must have 1..=64 hex digits, got {}",
            digits.len()
        )));
    }
    let padded = format!("{digits:0>64}");
    let mut out = [0u8; 32];
    hex::decode_to_slice(&padded, &mut out)
        .map_err(|e| TesseraError::invalid(format!("invalid object id {input}: {e}")))?;
    Ok(out)
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw id bytes
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw id bytes
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Raw id bytes by value
            pub const fn to_bytes(self) -> [u8; 32] {
                self.0
            }

            /// Derive an id deterministically from a label
            pub fn derive(label: &[u8]) -> Self {
                let mut hasher = Hasher::with_domain(stringify!($name).as_bytes());
                hasher.update_framed(label);
                Self(hasher.finalize())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = TesseraError;

            fn from_str(s: &str) -> Result<Self> {
                parse_object_bytes(s).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TesseraError;

            fn try_from(value: String) -> Result<Self> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

object_id! {
    /// Ledger handle of an access-control policy (membership list)
    PolicyId
}

object_id! {
    /// Namespace of the policy-evaluation logic a policy belongs to
    PackageId
}

object_id! {
    /// Ledger address of a principal (a user or service identity)
    PrincipalId
}

object_id! {
    /// Identifier of one key server in a committee
    KeyServerId
}

object_id! {
    /// Ledger-registered pointer to a stored blob
    ObjectHandle
}

/// External reference returned by `store`: the blob's ledger object handle
pub type SecretId = ObjectHandle;

impl PrincipalId {
    /// Signature-scheme flag byte for Ed25519 public keys
    pub const ED25519_FLAG: u8 = 0x00;

    /// Derive a principal address from an Ed25519 public key
    pub fn from_ed25519_public_key(public_key: &[u8; 32]) -> Self {
        let mut input = Vec::with_capacity(33);
        input.push(Self::ED25519_FLAG);
        input.extend_from_slice(public_key);
        Self(hash::hash(&input))
    }
}

/// Content identifier of a stored blob.
///
/// URL-safe unpadded base64 of the SHA-256 digest of the blob bytes, so
/// identical bytes always map to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobId(String);

impl BlobId {
    /// Compute the blob id for the given content
    pub fn for_content(content: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(hash::hash(content)))
    }

    /// Borrow the encoded id
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the content digest this id names
    pub fn digest(&self) -> Result<[u8; 32]> {
        let raw = URL_SAFE_NO_PAD
            .decode(&self.0)
            .map_err(|e| TesseraError::invalid(format!("invalid blob id {}: {e}", self.0)))?;
        raw.try_into()
            .map_err(|_| TesseraError::invalid(format!("blob id {} is not 32 bytes", self.0)))
    }

    /// Whether `content` hashes to this id
    pub fn matches(&self, content: &[u8]) -> bool {
        *self == Self::for_content(content)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobId {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self> {
        let id = Self(s.to_string());
        id.digest()?;
        Ok(id)
    }
}

impl TryFrom<String> for BlobId {
    type Error = TesseraError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BlobId> for String {
    fn from(id: BlobId) -> Self {
        id.0
    }
}

/// Process-local handle of a session credential, used for logging and lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionHandle(pub Uuid);

impl SessionHandle {
    /// Build a handle from 16 random bytes
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Inner UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_object_id_display_roundtrip() {
        let id = PolicyId::from_bytes([0xab; 32]);
        let rendered = id.to_string();
        assert!(rendered.starts_with("0xabab"));
        assert_eq!(rendered.len(), 66);
        assert_eq!(rendered.parse::<PolicyId>().unwrap(), id);
    }

    #[test]
    fn test_short_ids_are_left_padded() {
        let id: PackageId = "0x2".parse().unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 2;
        assert_eq!(id.to_bytes(), expected);
    }

    #[test]
    fn test_rejects_bad_hex() {
        assert!("0xzz".parse::<PolicyId>().is_err());
        assert!("0x".parse::<PolicyId>().is_err());
        assert!(format!("0x{}", "1".repeat(65)).parse::<PolicyId>().is_err());
    }

    #[test]
    fn test_blob_id_is_content_addressed() {
        let a = BlobId::for_content(b"ciphertext");
        let b = BlobId::for_content(b"ciphertext");
        let c = BlobId::for_content(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.matches(b"ciphertext"));
        assert_eq!(a.as_str().parse::<BlobId>().unwrap(), a);
    }

    #[test]
    fn test_principal_from_public_key_is_stable() {
        let a = PrincipalId::from_ed25519_public_key(&[7u8; 32]);
        let b = PrincipalId::from_ed25519_public_key(&[7u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, PrincipalId::from_ed25519_public_key(&[8u8; 32]));
    }

    #[test]
    fn test_ids_serialize_as_hex_strings() {
        let id = KeyServerId::derive(b"server-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: KeyServerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn prop_blob_id_parses_back(content in proptest::collection::vec(any::<u8>(), 0..256)) {
            let id = BlobId::for_content(&content);
            let parsed: BlobId = id.to_string().parse().unwrap();
            prop_assert!(parsed.matches(&content));
            prop_assert_eq!(parsed, id);
        }

        #[test]
        fn prop_object_ids_survive_json(bytes in any::<[u8; 32]>()) {
            let id = PolicyId::from_bytes(bytes);
            let json = serde_json::to_string(&id).unwrap();
            let back: PolicyId = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back.to_bytes(), bytes);
        }
    }
}

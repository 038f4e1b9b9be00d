//! Self-describing ciphertext format
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! "TSRA" | version u8 | package_id [32] | id_len u16 | key_identity
//!        | threshold u16 | server_count u8 | (server_id [32] | weight u8)*
//!        | encapsulation [128] | nonce [12] | ct_len u32 | ciphertext
//! ```
//!
//! Everything up to and including the encapsulation is the header and is
//! authenticated as associated data of the payload.

use crate::aead::NONCE_LEN;
use crate::identity::KeyIdentity;
use crate::tdh::{Encapsulation, ENCAPSULATION_LEN};
use serde::{Deserialize, Serialize};
use tessera_core::{KeyServerId, PackageId, PolicyId, Result, TesseraError};

/// Format magic
pub const MAGIC: &[u8; 4] = b"TSRA";

/// Current format version
pub const FORMAT_VERSION: u8 = 1;

/// Committee member as recorded in a ciphertext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyServerRef {
    /// Server identifier
    pub id: KeyServerId,
    /// Number of share indices the server holds
    pub weight: u8,
}

/// Encrypted payload plus everything needed to request its decryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedObject {
    /// Format version
    pub version: u8,
    /// Package whose policy logic governs decryption
    pub package_id: PackageId,
    /// Label the payload key is bound to
    pub key_identity: KeyIdentity,
    /// Shares needed to decrypt
    pub threshold: u16,
    /// Committee the ciphertext was encrypted to, in share-index order
    pub key_servers: Vec<KeyServerRef>,
    /// Threshold key encapsulation
    pub encapsulation: Encapsulation,
    /// AES-GCM nonce
    pub nonce: [u8; NONCE_LEN],
    /// AES-GCM ciphertext and tag
    pub ciphertext: Vec<u8>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| TesseraError::corrupt_ciphertext("ciphertext truncated"))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }
}

impl EncryptedObject {
    /// Policy governing this ciphertext
    pub fn policy_id(&self) -> PolicyId {
        self.key_identity.policy_id()
    }

    /// Sum of committee weights (total share indices)
    pub fn total_weight(&self) -> u32 {
        self.key_servers.iter().map(|s| u32::from(s.weight)).sum()
    }

    /// Serialized header, used as associated data
    pub fn header_bytes(&self) -> Result<Vec<u8>> {
        let id = self.key_identity.as_bytes();
        let id_len = u16::try_from(id.len())
            .map_err(|_| TesseraError::encryption("key identity too long"))?;
        let count = u8::try_from(self.key_servers.len())
            .map_err(|_| TesseraError::encryption("too many key servers"))?;

        let mut out = Vec::with_capacity(48 + id.len() + 33 * self.key_servers.len() + ENCAPSULATION_LEN);
        out.extend_from_slice(MAGIC);
        out.push(self.version);
        out.extend_from_slice(self.package_id.as_bytes());
        out.extend_from_slice(&id_len.to_be_bytes());
        out.extend_from_slice(id);
        out.extend_from_slice(&self.threshold.to_be_bytes());
        out.push(count);
        for server in &self.key_servers {
            out.extend_from_slice(server.id.as_bytes());
            out.push(server.weight);
        }
        out.extend_from_slice(&self.encapsulation.to_bytes());
        Ok(out)
    }

    /// Full wire encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let ct_len = u32::try_from(self.ciphertext.len())
            .map_err(|_| TesseraError::encryption("payload too large"))?;
        let mut out = self.header_bytes()?;
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&ct_len.to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Parse the wire encoding; any malformation is corrupt ciphertext
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader { bytes, pos: 0 };
        if r.take(4)? != MAGIC {
            return Err(TesseraError::corrupt_ciphertext("bad magic"));
        }
        let version = r.u8()?;
        if version != FORMAT_VERSION {
            return Err(TesseraError::corrupt_ciphertext(format!(
                "unsupported format version {version}"
            )));
        }
        let package_id = PackageId::from_bytes(r.array()?);
        let id_len = usize::from(r.u16()?);
        let key_identity = KeyIdentity::from_bytes(r.take(id_len)?)
            .map_err(|e| TesseraError::corrupt_ciphertext(e.message()))?;
        let threshold = r.u16()?;
        let count = r.u8()?;
        let mut key_servers = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            key_servers.push(KeyServerRef {
                id: KeyServerId::from_bytes(r.array()?),
                weight: r.u8()?,
            });
        }
        let encapsulation = Encapsulation::from_bytes(&r.array()?)?;
        let nonce = r.array()?;
        let ct_len = r.u32()? as usize;
        let ciphertext = r.take(ct_len)?.to_vec();
        if r.pos != bytes.len() {
            return Err(TesseraError::corrupt_ciphertext("trailing bytes after payload"));
        }

        let object = Self {
            version,
            package_id,
            key_identity,
            threshold,
            key_servers,
            encapsulation,
            nonce,
            ciphertext,
        };
        if object.threshold == 0 || u32::from(object.threshold) > object.total_weight() {
            return Err(TesseraError::corrupt_ciphertext(format!(
                "threshold {} inconsistent with committee weight {}",
                object.threshold,
                object.total_weight()
            )));
        }
        Ok(object)
    }
}

//! Whole-payload encryption to a committee and recombination
//!
//! Encryption is purely local: it needs the committee's public parameters
//! and randomness, never a key server.

use crate::aead::{ContentKey, NONCE_LEN};
use crate::identity::KeyIdentity;
use crate::object::{EncryptedObject, KeyServerRef, FORMAT_VERSION};
use crate::tdh::{combine_shares, DecryptionShare, Encapsulation, MasterPublicKey};
use rand_core::{CryptoRng, RngCore};
use std::collections::HashSet;
use tessera_core::{PackageId, Result, TesseraError};

/// Public parameters a payload is encrypted under
#[derive(Debug, Clone)]
pub struct SealParams {
    /// Package the key identity is scoped to
    pub package_id: PackageId,
    /// Label of the payload key
    pub key_identity: KeyIdentity,
    /// Shares required to decrypt
    pub threshold: u16,
    /// Committee members in share-index order
    pub key_servers: Vec<KeyServerRef>,
    /// Committee master public key
    pub master: MasterPublicKey,
}

/// Encrypt `plaintext` to the committee described by `params`
pub fn encrypt<R: RngCore + CryptoRng>(
    params: &SealParams,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<EncryptedObject> {
    if params.key_servers.is_empty() {
        return Err(TesseraError::encryption("no key servers configured"));
    }
    let mut seen = HashSet::new();
    if !params.key_servers.iter().all(|s| seen.insert(s.id)) {
        return Err(TesseraError::encryption("duplicate key server in committee"));
    }
    let total: u32 = params.key_servers.iter().map(|s| u32::from(s.weight)).sum();
    if params.threshold == 0 || u32::from(params.threshold) > total {
        return Err(TesseraError::encryption(format!(
            "threshold {} must be in 1..={total}",
            params.threshold
        )));
    }

    let label = params.key_identity.as_bytes();
    let (encapsulation, shared) = Encapsulation::new(&params.master, label, rng);
    let key = ContentKey::derive(&shared, label, encapsulation.u())?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let mut object = EncryptedObject {
        version: FORMAT_VERSION,
        package_id: params.package_id,
        key_identity: params.key_identity.clone(),
        threshold: params.threshold,
        key_servers: params.key_servers.clone(),
        encapsulation,
        nonce,
        ciphertext: Vec::new(),
    };
    let aad = object.header_bytes()?;
    object.ciphertext = key.seal(&nonce, plaintext, &aad)?;
    Ok(object)
}

/// Recombine verified shares and open the payload.
///
/// `shares` must already be verified against the committee's verification
/// keys; at least `threshold` with distinct indices are used.
pub fn decrypt(object: &EncryptedObject, shares: &[DecryptionShare]) -> Result<Vec<u8>> {
    let threshold = usize::from(object.threshold);
    let mut seen = HashSet::new();
    let distinct: Vec<DecryptionShare> = shares
        .iter()
        .filter(|s| seen.insert(s.index))
        .take(threshold)
        .copied()
        .collect();
    if distinct.len() < threshold {
        return Err(TesseraError::access_denied(format!(
            "{} of {threshold} required decryption shares available",
            distinct.len()
        )));
    }

    let shared = combine_shares(&distinct)?;
    let label = object.key_identity.as_bytes();
    let key = ContentKey::derive(&shared, label, object.encapsulation.u())?;
    key.open(&object.nonce, &object.ciphertext, &object.header_bytes()?)
}

//! Session certificates presented to key servers
//!
//! The certificate is the public half of a signed credential. Key servers
//! verify it without any state: the principal id must hash from the
//! principal key, the principal must have signed the challenge, and the
//! session must not have expired.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use tessera_core::hash::Hasher;
use tessera_core::{PackageId, PrincipalId, Result, TesseraError};

const REQUEST_DOMAIN: &[u8] = b"tessera.session.request";

/// Render the challenge a principal signs to authorize a session key
pub fn challenge_message(
    package_id: &PackageId,
    ttl_secs: u64,
    issued_at_ms: u64,
    session_public_key: &[u8; 32],
) -> Vec<u8> {
    let issued_at = i64::try_from(issued_at_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{issued_at_ms}ms"));
    format!(
        "Accessing keys of package {package_id} for {ttl_secs}s from {issued_at}, session key {}",
        STANDARD.encode(session_public_key)
    )
    .into_bytes()
}

/// Digest signed by the session key for one share request
pub(crate) fn request_digest(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Hasher::with_domain(REQUEST_DOMAIN);
    hasher.update_framed(payload);
    hasher.finalize()
}

/// Public, verifiable form of a signed session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCertificate {
    /// Principal the session acts for
    pub principal_id: PrincipalId,
    /// Principal's Ed25519 public key
    pub principal_public_key: [u8; 32],
    /// Package the session is scoped to
    pub package_id: PackageId,
    /// Issue time, ms since the Unix epoch
    pub issued_at_ms: u64,
    /// Lifetime in seconds
    pub ttl_secs: u64,
    /// Ephemeral session public key
    pub session_public_key: [u8; 32],
    /// Principal's signature over the challenge
    #[serde(with = "signature_bytes")]
    pub signature: [u8; 64],
}

impl SessionCertificate {
    /// Challenge text covered by [`SessionCertificate::signature`]
    pub fn challenge(&self) -> Vec<u8> {
        challenge_message(
            &self.package_id,
            self.ttl_secs,
            self.issued_at_ms,
            &self.session_public_key,
        )
    }

    /// Expiry instant, ms since the Unix epoch
    pub fn expires_at_ms(&self) -> u64 {
        self.issued_at_ms
            .saturating_add(self.ttl_secs.saturating_mul(1000))
    }

    /// Verify the principal binding, the challenge signature and expiry
    pub fn verify(&self, now_ms: u64) -> Result<()> {
        if PrincipalId::from_ed25519_public_key(&self.principal_public_key) != self.principal_id {
            return Err(TesseraError::invalid_session(
                "principal key does not match principal id",
            ));
        }
        let principal_key = VerifyingKey::from_bytes(&self.principal_public_key)
            .map_err(|e| TesseraError::invalid_session(format!("bad principal key: {e}")))?;
        principal_key
            .verify(&self.challenge(), &Signature::from_bytes(&self.signature))
            .map_err(|_| TesseraError::invalid_signature("session challenge signature"))?;
        if now_ms > self.expires_at_ms() {
            return Err(TesseraError::session_expired(format!(
                "session for {} expired at {}ms",
                self.principal_id,
                self.expires_at_ms()
            )));
        }
        Ok(())
    }

    /// Verify a share request signed by the session key
    pub fn verify_request(&self, payload: &[u8], signature: &[u8; 64]) -> Result<()> {
        let session_key = VerifyingKey::from_bytes(&self.session_public_key)
            .map_err(|e| TesseraError::invalid_session(format!("bad session key: {e}")))?;
        session_key
            .verify(&request_digest(payload), &Signature::from_bytes(signature))
            .map_err(|_| TesseraError::invalid_signature("share request signature"))
    }
}

mod signature_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let raw = STANDARD
            .decode(String::deserialize(deserializer)?)
            .map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))
    }
}

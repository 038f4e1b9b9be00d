//! Session credentials

use crate::certificate::{challenge_message, request_digest, SessionCertificate};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use std::fmt;
use tessera_core::{PackageId, PrincipalId, Result, SessionHandle, TesseraError};

/// Time-boxed capability for one principal to request decryption shares
/// under one package.
///
/// Holds the ephemeral session signing key, so it is deliberately not
/// `Clone`: exactly one call context owns it.
pub struct SessionCredential {
    handle: SessionHandle,
    principal_id: PrincipalId,
    package_id: PackageId,
    issued_at_ms: u64,
    ttl_secs: u64,
    session_key: SigningKey,
    principal_signature: Option<(VerifyingKey, Signature)>,
}

impl SessionCredential {
    pub(crate) fn new(
        handle: SessionHandle,
        principal_id: PrincipalId,
        package_id: PackageId,
        issued_at_ms: u64,
        ttl_secs: u64,
        session_key: SigningKey,
    ) -> Self {
        Self {
            handle,
            principal_id,
            package_id,
            issued_at_ms,
            ttl_secs,
            session_key,
            principal_signature: None,
        }
    }

    /// Process-local handle
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Principal the session acts for
    pub fn principal_id(&self) -> &PrincipalId {
        &self.principal_id
    }

    /// Package the session is scoped to
    pub fn package_id(&self) -> &PackageId {
        &self.package_id
    }

    /// Issue time, ms since the Unix epoch
    pub fn issued_at_ms(&self) -> u64 {
        self.issued_at_ms
    }

    /// Lifetime in seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Expiry instant, ms since the Unix epoch
    pub fn expires_at_ms(&self) -> u64 {
        self.issued_at_ms
            .saturating_add(self.ttl_secs.saturating_mul(1000))
    }

    /// Whether the principal's signature has been attached
    pub fn is_signed(&self) -> bool {
        self.principal_signature.is_some()
    }

    /// Whether `now_ms` is past the expiry instant
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms()
    }

    /// Ephemeral session public key
    pub fn session_public_key(&self) -> [u8; 32] {
        self.session_key.verifying_key().to_bytes()
    }

    /// Deterministic challenge the principal must sign
    pub fn challenge(&self) -> Vec<u8> {
        challenge_message(
            &self.package_id,
            self.ttl_secs,
            self.issued_at_ms,
            &self.session_public_key(),
        )
    }

    pub(crate) fn mark_signed(&mut self, principal_key: VerifyingKey, signature: Signature) {
        self.principal_signature = Some((principal_key, signature));
    }

    /// Local usability check for `package_id` at `now_ms`.
    ///
    /// Unsigned or foreign-package credentials are `InvalidSession`; a signed
    /// credential past its TTL is `SessionExpired`.
    pub fn ensure_usable(&self, package_id: &PackageId, now_ms: u64) -> Result<()> {
        if !self.is_signed() {
            return Err(TesseraError::invalid_session(format!(
                "{} has no verified principal signature",
                self.handle
            )));
        }
        if self.is_expired_at(now_ms) {
            return Err(TesseraError::session_expired(format!(
                "{} expired at {}ms",
                self.handle,
                self.expires_at_ms()
            )));
        }
        if self.package_id != *package_id {
            return Err(TesseraError::invalid_session(format!(
                "{} is scoped to package {}, not {package_id}",
                self.handle, self.package_id
            )));
        }
        Ok(())
    }

    /// Public certificate for key servers; only signed credentials have one
    pub fn certificate(&self) -> Result<SessionCertificate> {
        let (principal_key, signature) = self.principal_signature.as_ref().ok_or_else(|| {
            TesseraError::invalid_session(format!("{} is not signed", self.handle))
        })?;
        Ok(SessionCertificate {
            principal_id: self.principal_id,
            principal_public_key: principal_key.to_bytes(),
            package_id: self.package_id,
            issued_at_ms: self.issued_at_ms,
            ttl_secs: self.ttl_secs,
            session_public_key: self.session_public_key(),
            signature: signature.to_bytes(),
        })
    }

    /// Sign a share-request payload with the session key
    pub fn sign_request(&self, payload: &[u8]) -> [u8; 64] {
        self.session_key.sign(&request_digest(payload)).to_bytes()
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("handle", &self.handle)
            .field("principal_id", &self.principal_id)
            .field("package_id", &self.package_id)
            .field("issued_at_ms", &self.issued_at_ms)
            .field("ttl_secs", &self.ttl_secs)
            .field("signed", &self.is_signed())
            .finish_non_exhaustive()
    }
}

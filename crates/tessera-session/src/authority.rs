//! Session issuance and signature attachment

use crate::credential::SessionCredential;
use crate::directory::PrincipalDirectory;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::effects::{PhysicalTimeEffects, RandomEffects};
use tessera_core::{PackageId, PrincipalId, Result, SessionConfig, SessionHandle, TesseraError};
use tracing::{debug, warn};

/// Issues unsigned credentials and promotes them to signed ones
pub struct SessionAuthority {
    config: SessionConfig,
    directory: Arc<dyn PrincipalDirectory>,
    time: Arc<dyn PhysicalTimeEffects>,
    random: Arc<dyn RandomEffects>,
}

impl SessionAuthority {
    /// Create an authority bound to a directory and effect handlers
    pub fn new(
        config: SessionConfig,
        directory: Arc<dyn PrincipalDirectory>,
        time: Arc<dyn PhysicalTimeEffects>,
        random: Arc<dyn RandomEffects>,
    ) -> Self {
        Self {
            config,
            directory,
            time,
            random,
        }
    }

    /// Session limits in effect
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Effective TTL for a requested one: `None` means the configured default,
    /// anything above the maximum is capped to it
    pub fn effective_ttl_secs(&self, requested: Option<Duration>) -> Result<u64> {
        let ttl = requested.map_or(self.config.default_ttl_secs, |d| d.as_secs());
        if ttl == 0 {
            return Err(TesseraError::invalid("session ttl must be at least one second"));
        }
        if ttl > self.config.max_ttl_secs {
            warn!(
                requested = ttl,
                max = self.config.max_ttl_secs,
                "session ttl capped to configured maximum"
            );
            return Ok(self.config.max_ttl_secs);
        }
        Ok(ttl)
    }

    /// Create an unsigned credential for `principal_id` under `package_id`
    pub async fn create_session(
        &self,
        principal_id: PrincipalId,
        package_id: PackageId,
        ttl: Option<Duration>,
    ) -> Result<SessionCredential> {
        let ttl_secs = self.effective_ttl_secs(ttl)?;
        let issued_at_ms = self.time.now_ms().await;
        let session_key = SigningKey::from_bytes(&self.random.random_bytes_32().await);

        let mut handle_bytes = [0u8; 16];
        handle_bytes.copy_from_slice(&self.random.random_bytes(16).await);
        let handle = SessionHandle::from_random_bytes(handle_bytes);

        debug!(session = %handle, principal = %principal_id, package = %package_id, ttl_secs, "session created");
        Ok(SessionCredential::new(
            handle,
            principal_id,
            package_id,
            issued_at_ms,
            ttl_secs,
            session_key,
        ))
    }

    /// Challenge the principal must sign for `session`
    pub fn challenge(&self, session: &SessionCredential) -> Vec<u8> {
        session.challenge()
    }

    /// Verify the principal's signature over the challenge and mark the
    /// session signed.
    ///
    /// On any failure the credential stays unsigned.
    pub fn attach_signature(&self, session: &mut SessionCredential, signature: &[u8]) -> Result<()> {
        let principal_key = self
            .directory
            .public_key(session.principal_id())
            .ok_or_else(|| {
                TesseraError::invalid_signature(format!(
                    "no public key known for {}",
                    session.principal_id()
                ))
            })?;
        Self::verify_and_mark(session, principal_key, signature)
    }

    /// Create and sign a session in one step with the principal's own key
    pub async fn create_signed_session(
        &self,
        principal_key: &SigningKey,
        package_id: PackageId,
        ttl: Option<Duration>,
    ) -> Result<SessionCredential> {
        let verifying_key = principal_key.verifying_key();
        let principal_id = PrincipalId::from_ed25519_public_key(verifying_key.as_bytes());
        let mut session = self.create_session(principal_id, package_id, ttl).await?;
        let signature = principal_key.sign(&session.challenge());
        Self::verify_and_mark(&mut session, verifying_key, &signature.to_bytes())?;
        Ok(session)
    }

    fn verify_and_mark(
        session: &mut SessionCredential,
        principal_key: VerifyingKey,
        signature: &[u8],
    ) -> Result<()> {
        let signature = Signature::from_slice(signature)
            .map_err(|_| TesseraError::invalid_signature("signature must be 64 bytes"))?;
        if let Err(e) = principal_key.verify(&session.challenge(), &signature) {
            warn!(session = %session.handle(), principal = %session.principal_id(), "session signature rejected");
            return Err(TesseraError::invalid_signature(format!(
                "challenge signature does not verify: {e}"
            )));
        }

        session.mark_signed(principal_key, signature);
        debug!(session = %session.handle(), "session signed");
        Ok(())
    }

    /// Whether `session` has expired by the authority's clock
    pub async fn is_expired(&self, session: &SessionCredential) -> bool {
        session.is_expired_at(self.time.now_ms().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryPrincipalDirectory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tessera_core::ErrorKind;

    struct StepClock(AtomicU64);

    #[async_trait]
    impl PhysicalTimeEffects for StepClock {
        async fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct CountingRandom(AtomicU64);

    #[async_trait]
    impl RandomEffects for CountingRandom {
        async fn random_bytes(&self, len: usize) -> Vec<u8> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            (0..len).map(|i| (n as u8).wrapping_add(i as u8)).collect()
        }

        async fn random_bytes_32(&self) -> [u8; 32] {
            let mut out = [0u8; 32];
            out.copy_from_slice(&self.random_bytes(32).await);
            out
        }
    }

    fn authority() -> (SessionAuthority, Arc<StepClock>, Arc<MemoryPrincipalDirectory>) {
        let clock = Arc::new(StepClock(AtomicU64::new(1_700_000_000_000)));
        let directory = Arc::new(MemoryPrincipalDirectory::new());
        let authority = SessionAuthority::new(
            SessionConfig::default(),
            directory.clone(),
            clock.clone(),
            Arc::new(CountingRandom(AtomicU64::new(1))),
        );
        (authority, clock, directory)
    }

    #[tokio::test]
    async fn test_created_session_is_unsigned() {
        let (authority, _, _) = authority();
        let session = authority
            .create_session(PrincipalId::derive(b"alice"), PackageId::derive(b"pkg"), None)
            .await
            .unwrap();
        assert!(!session.is_signed());
        assert_eq!(session.ttl_secs(), 600);
        assert!(session.certificate().is_err());
    }

    #[tokio::test]
    async fn test_ttl_capped_and_zero_rejected() {
        let (authority, _, _) = authority();
        assert_eq!(
            authority
                .effective_ttl_secs(Some(Duration::from_secs(100_000)))
                .unwrap(),
            3600
        );
        assert!(authority.effective_ttl_secs(Some(Duration::ZERO)).is_err());
    }

    #[tokio::test]
    async fn test_challenge_is_deterministic() {
        let (authority, _, _) = authority();
        let session = authority
            .create_session(PrincipalId::derive(b"alice"), PackageId::derive(b"pkg"), None)
            .await
            .unwrap();
        let challenge = String::from_utf8(authority.challenge(&session)).unwrap();
        assert_eq!(challenge, String::from_utf8(session.challenge()).unwrap());
        assert!(challenge.starts_with("Accessing keys of package 0x"));
        assert!(challenge.contains("for 600s from 2023-11-14T22:13:20.000Z"));
    }

    #[tokio::test]
    async fn test_valid_signature_signs_session() {
        let (authority, _, directory) = authority();
        let alice = SigningKey::from_bytes(&[42u8; 32]);
        let principal = directory.register(alice.verifying_key());

        let mut session = authority
            .create_session(principal, PackageId::derive(b"pkg"), None)
            .await
            .unwrap();
        let signature = alice.sign(&session.challenge());
        authority
            .attach_signature(&mut session, &signature.to_bytes())
            .unwrap();
        assert!(session.is_signed());

        let cert = session.certificate().unwrap();
        cert.verify(session.issued_at_ms()).unwrap();
        let sig = session.sign_request(b"payload");
        cert.verify_request(b"payload", &sig).unwrap();
        assert!(cert.verify_request(b"other", &sig).is_err());
    }

    #[tokio::test]
    async fn test_bad_signature_leaves_session_unsigned() {
        let (authority, clock, directory) = authority();
        let alice = SigningKey::from_bytes(&[42u8; 32]);
        let mallory = SigningKey::from_bytes(&[7u8; 32]);
        let principal = directory.register(alice.verifying_key());

        let mut session = authority
            .create_session(principal, PackageId::derive(b"pkg"), None)
            .await
            .unwrap();
        let forged = mallory.sign(&session.challenge());
        let err = authority
            .attach_signature(&mut session, &forged.to_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSignature);
        assert!(!session.is_signed());

        let err = authority.attach_signature(&mut session, b"short").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSignature);

        let now = clock.now_ms().await;
        let err = session
            .ensure_usable(&PackageId::derive(b"pkg"), now)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSession);
    }

    #[tokio::test]
    async fn test_expiry_and_package_binding() {
        let (authority, clock, _) = authority();
        let alice = SigningKey::from_bytes(&[42u8; 32]);
        let pkg = PackageId::derive(b"pkg");
        let session = authority
            .create_signed_session(&alice, pkg, Some(Duration::from_secs(1)))
            .await
            .unwrap();

        let now = clock.now_ms().await;
        session.ensure_usable(&pkg, now).unwrap();
        assert_eq!(
            session
                .ensure_usable(&PackageId::derive(b"other"), now)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidSession
        );

        clock.0.fetch_add(2_000, Ordering::SeqCst);
        assert!(authority.is_expired(&session).await);
        let later = clock.now_ms().await;
        assert_eq!(
            session.ensure_usable(&pkg, later).unwrap_err().kind(),
            ErrorKind::SessionExpired
        );
        assert_eq!(
            session.certificate().unwrap().verify(later).unwrap_err().kind(),
            ErrorKind::SessionExpired
        );
    }
}

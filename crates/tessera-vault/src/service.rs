//! Caller-facing secure-content service

use crate::engine::ThresholdCryptoEngine;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tessera_blob::{BlobStore, SigningStrategy, WriteOptions};
use tessera_core::effects::PhysicalTimeEffects;
use tessera_core::{
    BlobId, PackageId, PolicyId, PrincipalId, Result, SecretId, TesseraConfig, TesseraError,
};
use tessera_ledger::PolicyLedgerClient;
use tessera_session::{SessionAuthority, SessionCredential};
use tracing::{debug, info, warn};

/// Identifiers of a stored secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSecret {
    /// Object handle of the stored blob, used as the external reference
    pub secret_id: SecretId,
    /// Content id of the ciphertext
    pub blob_id: BlobId,
    /// Hex key identity the payload was encrypted under
    pub key_identity: String,
    /// First storage epoch at which the blob is gone
    pub end_epoch: u64,
}

/// Seal-and-store and fetch-and-unseal over injected collaborators.
///
/// Holds no durable state. Session credentials are owned by callers and only
/// borrowed here.
pub struct SecureContentService {
    engine: ThresholdCryptoEngine,
    sessions: SessionAuthority,
    ledger: Arc<dyn PolicyLedgerClient>,
    blobs: Arc<dyn BlobStore>,
    signing: SigningStrategy,
    time: Arc<dyn PhysicalTimeEffects>,
    config: TesseraConfig,
}

/// Run `call` under `deadline`, mapping expiry through `on_timeout`
async fn bounded<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T>>,
    on_timeout: impl FnOnce() -> TesseraError,
) -> Result<T> {
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| on_timeout())?
}

impl SecureContentService {
    /// Assemble a service; see [`crate::ServiceBuilder`] for the usual path
    pub fn new(
        engine: ThresholdCryptoEngine,
        sessions: SessionAuthority,
        ledger: Arc<dyn PolicyLedgerClient>,
        blobs: Arc<dyn BlobStore>,
        signing: SigningStrategy,
        time: Arc<dyn PhysicalTimeEffects>,
        config: TesseraConfig,
    ) -> Self {
        Self {
            engine,
            sessions,
            ledger,
            blobs,
            signing,
            time,
            config,
        }
    }

    /// Threshold engine
    pub fn engine(&self) -> &ThresholdCryptoEngine {
        &self.engine
    }

    /// Session authority
    pub fn sessions(&self) -> &SessionAuthority {
        &self.sessions
    }

    /// Storage signing strategy in effect
    pub fn signing(&self) -> &SigningStrategy {
        &self.signing
    }

    /// Configuration the service was built with
    pub fn config(&self) -> &TesseraConfig {
        &self.config
    }

    /// Encrypt `plaintext` under `policy_id` and store the ciphertext.
    ///
    /// Nothing is returned or retained unless the write succeeds.
    pub async fn store(
        &self,
        policy_id: &PolicyId,
        package_id: &PackageId,
        plaintext: &[u8],
    ) -> Result<StoredSecret> {
        let object = self.engine.encrypt(policy_id, package_id, plaintext).await?;
        let ciphertext = object.to_bytes()?;

        let storage = &self.config.storage;
        let receipt = bounded(
            storage.write_timeout(),
            self.blobs.write(
                &ciphertext,
                WriteOptions::from(storage),
                self.signing.signer(),
            ),
            || {
                TesseraError::storage_write(format!(
                    "blob write timed out after {:?}",
                    storage.write_timeout()
                ))
            },
        )
        .await
        .map_err(|e| {
            warn!(policy_id = %policy_id, error = %e, "store failed, ciphertext discarded");
            e
        })?;

        info!(
            policy_id = %policy_id,
            blob_id = %receipt.blob_id,
            secret_id = %receipt.object_handle,
            signing = self.signing.mode(),
            "secret stored"
        );
        Ok(StoredSecret {
            secret_id: receipt.object_handle,
            blob_id: receipt.blob_id,
            key_identity: object.key_identity.to_hex(),
            end_epoch: receipt.end_epoch,
        })
    }

    /// Fetch a stored ciphertext and decrypt it for `session`.
    ///
    /// Unsigned, expired or foreign-package sessions fail before any storage
    /// or key-server call.
    pub async fn retrieve(
        &self,
        policy_id: &PolicyId,
        package_id: &PackageId,
        blob_id: &BlobId,
        session: &SessionCredential,
    ) -> Result<Vec<u8>> {
        session.ensure_usable(package_id, self.time.now_ms().await)?;

        let storage = &self.config.storage;
        let ciphertext = bounded(storage.read_timeout(), self.blobs.read(blob_id), || {
            TesseraError::storage_read(format!(
                "blob read timed out after {:?}",
                storage.read_timeout()
            ))
        })
        .await?;

        let object = tessera_crypto::EncryptedObject::from_bytes(&ciphertext)?;
        if object.package_id != *package_id {
            return Err(TesseraError::access_denied(format!(
                "blob {blob_id} belongs to package {}, not {package_id}",
                object.package_id
            )));
        }
        if !object.key_identity.is_governed_by(policy_id) {
            return Err(TesseraError::access_denied(format!(
                "blob {blob_id} is not governed by policy {policy_id}"
            )));
        }

        let plaintext = self.engine.decrypt(&object, session).await?;
        info!(policy_id = %policy_id, blob_id = %blob_id, session = %session.handle(), "secret retrieved");
        Ok(plaintext)
    }

    /// Start an unsigned session; the caller signs [`SessionCredential::challenge`]
    pub async fn create_session(
        &self,
        principal_id: PrincipalId,
        package_id: PackageId,
        ttl: Option<Duration>,
    ) -> Result<SessionCredential> {
        self.sessions.create_session(principal_id, package_id, ttl).await
    }

    /// Attach the principal's challenge signature
    pub fn attach_signature(&self, session: &mut SessionCredential, signature: &[u8]) -> Result<()> {
        self.sessions.attach_signature(session, signature)
    }

    /// Create and sign a session with the principal's own key
    pub async fn create_signed_session(
        &self,
        principal_key: &SigningKey,
        package_id: PackageId,
        ttl: Option<Duration>,
    ) -> Result<SessionCredential> {
        self.sessions
            .create_signed_session(principal_key, package_id, ttl)
            .await
    }

    /// Record a stored blob on its policy
    pub async fn publish_blob(
        &self,
        sender: &PrincipalId,
        policy_id: &PolicyId,
        blob_id: &BlobId,
    ) -> Result<()> {
        let deadline = self.config.ledger.check_timeout();
        bounded(
            deadline,
            self.ledger.publish_blob(sender, policy_id, blob_id),
            || TesseraError::ledger(format!("publish timed out after {deadline:?}")),
        )
        .await?;
        debug!(policy_id = %policy_id, blob_id = %blob_id, "blob published");
        Ok(())
    }

    /// Delete a deletable blob written through this service's signer
    pub async fn delete_blob(&self, secret_id: &SecretId) -> Result<()> {
        let deadline = self.config.storage.write_timeout();
        bounded(
            deadline,
            self.blobs.delete(secret_id, self.signing.signer()),
            || TesseraError::storage_write(format!("blob delete timed out after {deadline:?}")),
        )
        .await
    }
}

impl std::fmt::Debug for SecureContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureContentService")
            .field("engine", &self.engine)
            .field("signing", &self.signing)
            .finish_non_exhaustive()
    }
}

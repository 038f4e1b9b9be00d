//! Threshold crypto engine
//!
//! Encryption is local: a fresh key identity under the policy, then TDH1
//! encapsulation to the committee's master key. Decryption checks the
//! session and the ciphertext header locally, then asks the key-server pool
//! for a quorum of verified shares.

use std::sync::Arc;
use tessera_core::effects::{PhysicalTimeEffects, RandomEffects};
use tessera_core::{PackageId, PolicyId, Result, TesseraError};
use tessera_crypto::{
    rng_from_seed, EncryptedObject, KeyIdentity, SealParams, KEY_NONCE_LEN,
};
use tessera_keyserver::{CommitteeDescriptor, KeyServerPool, ShareRequest};
use tessera_ledger::ApprovalTransaction;
use tessera_session::SessionCredential;
use tracing::{debug, warn};

/// Encrypts to and decrypts through a key-server committee
pub struct ThresholdCryptoEngine {
    pool: KeyServerPool,
    time: Arc<dyn PhysicalTimeEffects>,
    random: Arc<dyn RandomEffects>,
}

impl ThresholdCryptoEngine {
    /// Create an engine over a connected pool
    pub fn new(
        pool: KeyServerPool,
        time: Arc<dyn PhysicalTimeEffects>,
        random: Arc<dyn RandomEffects>,
    ) -> Self {
        Self { pool, time, random }
    }

    /// Committee ciphertexts are encrypted to
    pub fn committee(&self) -> &CommitteeDescriptor {
        self.pool.committee()
    }

    /// Key-server pool used for decryption
    pub fn pool(&self) -> &KeyServerPool {
        &self.pool
    }

    /// Draw a fresh key identity under `policy_id`
    pub async fn fresh_identity(&self, policy_id: &PolicyId) -> Result<KeyIdentity> {
        let nonce: [u8; KEY_NONCE_LEN] = self
            .random
            .random_bytes(KEY_NONCE_LEN)
            .await
            .try_into()
            .map_err(|_| TesseraError::encryption("random source returned a short nonce"))?;
        Ok(KeyIdentity::new(policy_id, nonce))
    }

    /// Encrypt `plaintext` under a fresh identity governed by `policy_id`
    pub async fn encrypt(
        &self,
        policy_id: &PolicyId,
        package_id: &PackageId,
        plaintext: &[u8],
    ) -> Result<EncryptedObject> {
        let committee = self.committee();
        let master = committee
            .master()
            .map_err(|e| TesseraError::encryption(format!("committee master key: {}", e.message())))?;
        let params = SealParams {
            package_id: *package_id,
            key_identity: self.fresh_identity(policy_id).await?,
            threshold: committee.threshold,
            key_servers: committee.key_server_refs(),
            master,
        };

        let mut rng = rng_from_seed(self.random.random_bytes_32().await);
        let object = tessera_crypto::encrypt(&params, plaintext, &mut rng)?;
        debug!(policy_id = %policy_id, key_identity = %object.key_identity, "payload encrypted");
        Ok(object)
    }

    /// Decrypt with shares released to `session`.
    ///
    /// The session and header are checked before any key server is asked.
    pub async fn decrypt(
        &self,
        object: &EncryptedObject,
        session: &SessionCredential,
    ) -> Result<Vec<u8>> {
        session.ensure_usable(&object.package_id, self.time.now_ms().await)?;

        if !object
            .encapsulation
            .verify(object.key_identity.as_bytes())
        {
            return Err(TesseraError::corrupt_ciphertext(format!(
                "header proof does not verify for key identity {}",
                object.key_identity
            )));
        }
        if !self.committee().matches(object) {
            return Err(TesseraError::encryption(
                "ciphertext was encrypted to a different key-server committee",
            ));
        }

        let tx = ApprovalTransaction::new(
            object.package_id,
            object.policy_id(),
            object.key_identity.clone(),
        );
        let request = ShareRequest::new(&tx, &object.encapsulation, session)?;
        let collection = self.pool.request_shares(&request, object.threshold).await?;
        if !collection.has_quorum(object.threshold) {
            warn!(
                key_identity = %object.key_identity,
                shares = collection.shares.len(),
                threshold = object.threshold,
                "decryption quorum not reached"
            );
            return Err(TesseraError::access_denied(format!(
                "{} of {} decryption shares: {}",
                collection.shares.len(),
                object.threshold,
                collection.summary()
            )));
        }

        tessera_crypto::decrypt(object, &collection.shares)
    }

    /// Parse serialized ciphertext and decrypt it
    pub async fn decrypt_bytes(
        &self,
        ciphertext: &[u8],
        session: &SessionCredential,
    ) -> Result<Vec<u8>> {
        let object = EncryptedObject::from_bytes(ciphertext)?;
        self.decrypt(&object, session).await
    }
}

impl std::fmt::Debug for ThresholdCryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdCryptoEngine")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

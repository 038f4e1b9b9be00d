//! Service construction
//!
//! Every collaborator is passed in explicitly; nothing is looked up from
//! global state or the environment. Missing effect handlers default to the
//! production ones; a missing directory defaults to an empty one, which
//! leaves `create_signed_session` as the only way to sign.

use crate::engine::ThresholdCryptoEngine;
use crate::service::SecureContentService;
use std::sync::Arc;
use tessera_blob::{BlobStore, SigningStrategy, StorageSigner};
use tessera_core::effects::{PhysicalTimeEffects, RandomEffects};
use tessera_core::{ConfigValidation, Result, TesseraConfig, TesseraError};
use tessera_keyserver::{CommitteeDescriptor, KeyServer, KeyServerPool};
use tessera_ledger::PolicyLedgerClient;
use tessera_session::{MemoryPrincipalDirectory, PrincipalDirectory, SessionAuthority};
use tracing::info;

/// Builder for [`SecureContentService`]
#[derive(Default)]
pub struct ServiceBuilder {
    config: TesseraConfig,
    committee: Option<CommitteeDescriptor>,
    key_servers: Vec<Arc<dyn KeyServer>>,
    ledger: Option<Arc<dyn PolicyLedgerClient>>,
    blobs: Option<Arc<dyn BlobStore>>,
    directory: Option<Arc<dyn PrincipalDirectory>>,
    user_signer: Option<Arc<dyn StorageSigner>>,
    time: Option<Arc<dyn PhysicalTimeEffects>>,
    random: Option<Arc<dyn RandomEffects>>,
}

impl ServiceBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn with_config(mut self, config: TesseraConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the committee ciphertexts are encrypted to
    pub fn with_committee(mut self, committee: CommitteeDescriptor) -> Self {
        self.committee = Some(committee);
        self
    }

    /// Add a connected key server
    pub fn with_key_server(mut self, server: Arc<dyn KeyServer>) -> Self {
        self.key_servers.push(server);
        self
    }

    /// Set the policy ledger client
    pub fn with_ledger(mut self, ledger: Arc<dyn PolicyLedgerClient>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set the blob store
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Set the principal key directory used by `attach_signature`
    pub fn with_directory(mut self, directory: Arc<dyn PrincipalDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Supply the storage signer for user-managed signing
    pub fn with_user_signer(mut self, signer: Arc<dyn StorageSigner>) -> Self {
        self.user_signer = Some(signer);
        self
    }

    /// Override the clock
    pub fn with_time(mut self, time: Arc<dyn PhysicalTimeEffects>) -> Self {
        self.time = Some(time);
        self
    }

    /// Override the random source
    pub fn with_random(mut self, random: Arc<dyn RandomEffects>) -> Self {
        self.random = Some(random);
        self
    }

    /// Validate configuration and wire the service
    pub fn build(self) -> Result<SecureContentService> {
        self.config.validate()?;
        let committee = self
            .committee
            .ok_or_else(|| TesseraError::invalid("key-server committee required"))?;
        if committee.threshold != self.config.threshold.threshold {
            return Err(TesseraError::invalid(format!(
                "committee threshold {} differs from configured threshold {}",
                committee.threshold, self.config.threshold.threshold
            )));
        }
        let ledger = self
            .ledger
            .ok_or_else(|| TesseraError::invalid("policy ledger client required"))?;
        let blobs = self
            .blobs
            .ok_or_else(|| TesseraError::invalid("blob store required"))?;
        let directory: Arc<dyn PrincipalDirectory> = match self.directory {
            Some(directory) => directory,
            None => Arc::new(MemoryPrincipalDirectory::new()),
        };
        let time: Arc<dyn PhysicalTimeEffects> = match self.time {
            Some(time) => time,
            None => Arc::new(tessera_effects::RealTimeHandler::new()),
        };
        let random: Arc<dyn RandomEffects> = match self.random {
            Some(random) => random,
            None => Arc::new(tessera_effects::RealRandomHandler::new()),
        };

        let signing = SigningStrategy::from_config(&self.config.storage.signing, self.user_signer)?;
        let pool = KeyServerPool::new(committee, self.key_servers, self.config.pool.clone())?;
        let engine = ThresholdCryptoEngine::new(pool, time.clone(), random.clone());
        let sessions = SessionAuthority::new(
            self.config.session.clone(),
            directory,
            time.clone(),
            random,
        );

        info!(
            threshold = self.config.threshold.threshold,
            committee = engine.committee().members.len(),
            signing = signing.mode(),
            "secure content service ready"
        );
        Ok(SecureContentService::new(
            engine,
            sessions,
            ledger,
            blobs,
            signing,
            time,
            self.config,
        ))
    }
}

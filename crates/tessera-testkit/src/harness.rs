//! Full-stack in-process harness
//!
//! Deals a committee, starts one local key server per member (optionally
//! swapped for a misbehaving one), and wires a [`SecureContentService`] over
//! an in-memory ledger and blob store. Every key server is wrapped in a
//! [`CountingKeyServer`] so tests can assert how many requests were made.

use crate::fixtures::Principal;
use crate::keyservers::{
    CorruptingKeyServer, CountingKeyServer, OfflineKeyServer, RefusingKeyServer, StalledKeyServer,
};
use crate::random::SeededRandomHandler;
use crate::time::ControllableClock;
use std::sync::Arc;
use std::time::Duration;
use tessera_blob::{Ed25519StorageSigner, MemoryBlobStore};
use tessera_core::{KeyServerEntry, KeyServerId, PackageId, PolicyId, SigningConfig, TesseraConfig};
use tessera_crypto::rng_from_seed;
use tessera_keyserver::{generate_committee, CommitteeDescriptor, KeyServer, LocalKeyServer};
use tessera_ledger::{MemoryLedger, PolicyLedgerClient};
use tessera_session::{MemoryPrincipalDirectory, SessionCredential};
use tessera_vault::{SecureContentService, ServiceBuilder};

/// How one committee member behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerBehavior {
    /// Runs the real protocol
    Honest,
    /// Always unreachable
    Offline,
    /// Always declines
    Refusing,
    /// Releases shares with broken proofs
    Corrupting,
    /// Never answers in time
    Stalled,
}

/// Configures a [`VaultHarness`]
#[derive(Debug, Clone)]
pub struct HarnessBuilder {
    threshold: u16,
    weights: Vec<u8>,
    behaviors: Vec<ServerBehavior>,
    config: TesseraConfig,
    seed: u64,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            threshold: 2,
            weights: vec![1, 1, 1],
            behaviors: Vec::new(),
            config: TesseraConfig::default(),
            seed: 42,
        }
    }
}

impl HarnessBuilder {
    /// Shares needed to decrypt
    pub fn threshold(mut self, threshold: u16) -> Self {
        self.threshold = threshold;
        self
    }

    /// One weight per committee member
    pub fn weights(mut self, weights: &[u8]) -> Self {
        self.weights = weights.to_vec();
        self
    }

    /// Behavior of the member at `position`; others stay honest
    pub fn behavior(mut self, position: usize, behavior: ServerBehavior) -> Self {
        if self.behaviors.len() <= position {
            self.behaviors.resize(position + 1, ServerBehavior::Honest);
        }
        self.behaviors[position] = behavior;
        self
    }

    /// Base configuration; threshold, committee and signing are overwritten
    pub fn config(mut self, config: TesseraConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed for keys and effect randomness
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Wire everything
    pub fn build(self) -> VaultHarness {
        let clock = ControllableClock::default();
        let ledger = Arc::new(MemoryLedger::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let directory = Arc::new(MemoryPrincipalDirectory::new());

        let entries: Vec<KeyServerEntry> = self
            .weights
            .iter()
            .enumerate()
            .map(|(i, weight)| KeyServerEntry {
                id: KeyServerId::derive(format!("key-server-{i}").as_bytes()),
                weight: *weight,
                url: None,
            })
            .collect();
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&self.seed.to_be_bytes());
        let (committee, secrets) =
            generate_committee(self.threshold, &entries, &mut rng_from_seed(seed))
                .expect("committee parameters");

        let mut config = self.config;
        config.threshold.threshold = self.threshold;
        config.threshold.key_servers = entries;
        config.storage.signing = SigningConfig::UserManaged;

        let mut counters = Vec::with_capacity(secrets.len());
        let mut builder = ServiceBuilder::new()
            .with_committee(committee.clone())
            .with_ledger(ledger.clone())
            .with_blob_store(blobs.clone())
            .with_directory(directory.clone())
            .with_user_signer(Arc::new(Ed25519StorageSigner::from_secret(&seed)))
            .with_time(Arc::new(clock.clone()))
            .with_random(Arc::new(SeededRandomHandler::new(self.seed)));

        for (position, secret) in secrets.iter().enumerate() {
            let honest: Arc<dyn KeyServer> = Arc::new(
                LocalKeyServer::new(
                    secret,
                    ledger.clone(),
                    Arc::new(clock.clone()),
                    Arc::new(SeededRandomHandler::new(self.seed + position as u64 + 1)),
                    &config.ledger,
                )
                .expect("dealt secret"),
            );
            let behavior = self
                .behaviors
                .get(position)
                .copied()
                .unwrap_or(ServerBehavior::Honest);
            let server: Arc<dyn KeyServer> = match behavior {
                ServerBehavior::Honest => honest,
                ServerBehavior::Offline => Arc::new(OfflineKeyServer(secret.id)),
                ServerBehavior::Refusing => Arc::new(RefusingKeyServer(secret.id)),
                ServerBehavior::Corrupting => Arc::new(CorruptingKeyServer::new(honest)),
                ServerBehavior::Stalled => Arc::new(StalledKeyServer(secret.id)),
            };
            let counter = Arc::new(CountingKeyServer::new(server));
            builder = builder.with_key_server(counter.clone());
            counters.push(counter);
        }

        let service = builder.with_config(config).build().expect("service wiring");
        VaultHarness {
            service,
            ledger,
            blobs,
            directory,
            clock,
            committee,
            counters,
            package: PackageId::derive(b"tessera-test-package"),
        }
    }
}

/// A wired service plus handles on its collaborators
pub struct VaultHarness {
    /// Service under test
    pub service: SecureContentService,
    /// Policy ledger
    pub ledger: Arc<MemoryLedger>,
    /// Blob storage
    pub blobs: Arc<MemoryBlobStore>,
    /// Principal keys known to `attach_signature`
    pub directory: Arc<MemoryPrincipalDirectory>,
    /// Clock shared by the service and the key servers
    pub clock: ControllableClock,
    /// Public committee parameters
    pub committee: CommitteeDescriptor,
    /// Per-member request counters, in committee order
    pub counters: Vec<Arc<CountingKeyServer>>,
    /// Package all policies are created under
    pub package: PackageId,
}

impl VaultHarness {
    /// Builder with a 2-of-3 honest committee
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// 2-of-3 honest committee
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Total key-server requests made so far
    pub fn key_server_calls(&self) -> u64 {
        self.counters.iter().map(|c| c.calls()).sum()
    }

    /// Register a principal's key with the directory
    pub fn register(&self, principal: &Principal) {
        self.directory.register(principal.verifying_key());
    }

    /// Create a policy owned by `owner` with the extra `members`
    pub async fn policy(&self, owner: &Principal, members: &[&Principal]) -> PolicyId {
        let policy = self
            .ledger
            .create_policy(&owner.id, &self.package, "harness-policy")
            .await
            .expect("create policy");
        for member in members {
            self.ledger
                .add_member(&owner.id, &policy, &member.id)
                .await
                .expect("add member");
        }
        policy
    }

    /// Signed session for `principal` in the harness package
    pub async fn session(&self, principal: &Principal, ttl: Option<Duration>) -> SessionCredential {
        self.service
            .create_signed_session(&principal.key, self.package, ttl)
            .await
            .expect("signed session")
    }
}

impl Default for VaultHarness {
    fn default() -> Self {
        Self::new()
    }
}

//! Quorum fan-out over the key-server committee
//!
//! [`KeyServerPool::request_shares`] sends one request to every committee
//! member at once and collects answers as they complete. Each answer is
//! verified against the committee's verification keys before it counts.
//! Collection stops at the first of:
//!
//! - `quorum` distinct verified share indices,
//! - every server has answered,
//! - the quorum deadline,
//! - more invalid answers than the configured budget tolerates.
//!
//! Dropping the remaining futures cancels the outstanding requests.

use crate::committee::CommitteeDescriptor;
use crate::protocol::{describe, ServerResult, ShareOutcome, ShareRequest};
use crate::server::KeyServer;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tessera_core::{KeyServerId, PoolConfig, Result, TesseraError};
use tessera_crypto::{DecryptionShare, Encapsulation};
use tracing::{debug, warn};

/// What a fan-out gathered
#[derive(Debug, Clone, Default)]
pub struct ShareCollection {
    /// Verified shares with distinct indices
    pub shares: Vec<DecryptionShare>,
    /// Answer of every server heard from, in arrival order
    pub results: Vec<(KeyServerId, ServerResult)>,
    /// Servers whose answer failed verification
    pub invalid: u32,
    /// The quorum deadline passed before collection finished
    pub timed_out: bool,
    /// Collection stopped because too many answers were invalid
    pub budget_exhausted: bool,
}

impl ShareCollection {
    /// Whether at least `threshold` distinct indices were verified
    pub fn has_quorum(&self, threshold: u16) -> bool {
        self.shares.len() >= usize::from(threshold)
    }

    /// Number of explicit refusals
    pub fn refusals(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, ServerResult::Refused(_)))
            .count()
    }

    /// Number of servers that failed to answer
    pub fn unreachable(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, ServerResult::Unreachable(_)))
            .count()
    }

    /// One-line account of every answer, for error messages
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .results
            .iter()
            .map(|(server, result)| describe(server, result))
            .collect();
        if self.timed_out {
            parts.push("quorum deadline reached".to_string());
        }
        if self.budget_exhausted {
            parts.push("invalid share budget exhausted".to_string());
        }
        parts.join("; ")
    }
}

/// Connections to the committee's key servers
pub struct KeyServerPool {
    committee: CommitteeDescriptor,
    servers: HashMap<KeyServerId, Arc<dyn KeyServer>>,
    config: PoolConfig,
}

impl KeyServerPool {
    /// Bind connected servers to a committee.
    ///
    /// Members without a connection are treated as unreachable.
    pub fn new(
        committee: CommitteeDescriptor,
        servers: Vec<Arc<dyn KeyServer>>,
        config: PoolConfig,
    ) -> Result<Self> {
        committee.validate()?;
        let mut connected = HashMap::new();
        for server in servers {
            let id = server.id();
            if committee.member(&id).is_none() {
                return Err(TesseraError::invalid(format!(
                    "key server {id} is not a committee member"
                )));
            }
            if connected.insert(id, server).is_some() {
                return Err(TesseraError::invalid(format!("key server {id} connected twice")));
            }
        }
        Ok(Self {
            committee,
            servers: connected,
            config,
        })
    }

    /// Committee the pool serves
    pub fn committee(&self) -> &CommitteeDescriptor {
        &self.committee
    }

    /// Fan-out limits
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Ask one server, bounded by the per-request deadline
    pub async fn request_share(
        &self,
        server_id: &KeyServerId,
        request: &ShareRequest,
    ) -> Result<ShareOutcome> {
        let server = self.servers.get(server_id).ok_or_else(|| {
            TesseraError::key_server_unreachable(format!("no connection to key server {server_id}"))
        })?;
        let timeout = self.config.request_timeout();
        tokio::time::timeout(timeout, server.request_share(request))
            .await
            .map_err(|_| {
                TesseraError::key_server_unreachable(format!(
                    "key server {server_id} did not answer within {timeout:?}"
                ))
            })?
    }

    /// Collect shares from the whole committee until `quorum` distinct
    /// indices verify
    pub async fn request_shares(
        &self,
        request: &ShareRequest,
        quorum: u16,
    ) -> Result<ShareCollection> {
        let encapsulation = request.decode_encapsulation()?;
        let deadline = tokio::time::Instant::now() + self.config.quorum_timeout();

        let mut pending: FuturesUnordered<_> = self
            .committee
            .members
            .iter()
            .map(|member| {
                let id = member.id;
                async move { (id, self.request_share(&id, request).await) }
            })
            .collect();

        let mut collection = ShareCollection::default();
        let mut indices = HashSet::new();
        while !collection.has_quorum(quorum) {
            let (server, outcome) = match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some(answer)) => answer,
                Ok(None) => break,
                Err(_) => {
                    warn!(pending = pending.len(), "quorum deadline reached");
                    collection.timed_out = true;
                    break;
                }
            };

            let result = match outcome {
                Ok(ShareOutcome::Granted(shares)) => {
                    if self.verify_shares(&server, &shares, &encapsulation) {
                        let before = collection.shares.len();
                        for share in shares {
                            if indices.insert(share.index) {
                                collection.shares.push(share);
                            }
                        }
                        debug!(server = %server, verified = collection.shares.len() - before, "shares verified");
                        ServerResult::Verified(collection.shares.len() - before)
                    } else {
                        warn!(server = %server, "discarding invalid decryption share");
                        collection.invalid += 1;
                        ServerResult::Invalid
                    }
                }
                Ok(ShareOutcome::Refused(reason)) => {
                    warn!(server = %server, reason = %reason, "key server refused share");
                    ServerResult::Refused(reason)
                }
                Err(e) => {
                    warn!(server = %server, error = %e, "key server unreachable");
                    ServerResult::Unreachable(e.message().to_string())
                }
            };
            collection.results.push((server, result));

            if collection.invalid > self.config.max_invalid_shares {
                collection.budget_exhausted = true;
                break;
            }
        }

        debug!(
            shares = collection.shares.len(),
            quorum,
            abandoned = pending.len(),
            "share collection finished"
        );
        Ok(collection)
    }

    /// Every share must carry an index the server holds and a valid proof
    fn verify_shares(
        &self,
        server: &KeyServerId,
        shares: &[DecryptionShare],
        encapsulation: &Encapsulation,
    ) -> bool {
        !shares.is_empty()
            && shares.iter().all(|share| {
                self.committee
                    .verification_key(server, share.index)
                    .is_some_and(|vk| share.verify(&vk, encapsulation))
            })
    }
}

impl std::fmt::Debug for KeyServerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut connected: Vec<_> = self.servers.keys().collect();
        connected.sort();
        f.debug_struct("KeyServerPool")
            .field("threshold", &self.committee.threshold)
            .field("members", &self.committee.members.len())
            .field("connected", &connected)
            .finish_non_exhaustive()
    }
}

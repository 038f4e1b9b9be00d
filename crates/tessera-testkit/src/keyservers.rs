//! Instrumented and misbehaving key servers

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{KeyServerId, Result, TesseraError};
use tessera_crypto::group::generator;
use tessera_keyserver::{KeyServer, ShareOutcome, ShareRequest};

/// Counts requests before delegating
pub struct CountingKeyServer {
    inner: Arc<dyn KeyServer>,
    calls: AtomicU64,
}

impl CountingKeyServer {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn KeyServer>) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    /// Requests received so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyServer for CountingKeyServer {
    fn id(&self) -> KeyServerId {
        self.inner.id()
    }

    async fn request_share(&self, request: &ShareRequest) -> Result<ShareOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.request_share(request).await
    }
}

/// Never reachable
pub struct OfflineKeyServer(pub KeyServerId);

#[async_trait]
impl KeyServer for OfflineKeyServer {
    fn id(&self) -> KeyServerId {
        self.0
    }

    async fn request_share(&self, _request: &ShareRequest) -> Result<ShareOutcome> {
        Err(TesseraError::key_server_unreachable(format!(
            "key server {} is offline",
            self.0
        )))
    }
}

/// Always declines, as if its policy check failed
pub struct RefusingKeyServer(pub KeyServerId);

#[async_trait]
impl KeyServer for RefusingKeyServer {
    fn id(&self) -> KeyServerId {
        self.0
    }

    async fn request_share(&self, _request: &ShareRequest) -> Result<ShareOutcome> {
        Ok(ShareOutcome::Refused("access_denied: policy check failed".into()))
    }
}

/// Answers only after an hour
pub struct StalledKeyServer(pub KeyServerId);

#[async_trait]
impl KeyServer for StalledKeyServer {
    fn id(&self) -> KeyServerId {
        self.0
    }

    async fn request_share(&self, _request: &ShareRequest) -> Result<ShareOutcome> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(ShareOutcome::Refused("stalled".into()))
    }
}

/// Runs the real protocol but shifts every released point, so the proofs
/// no longer match
pub struct CorruptingKeyServer {
    inner: Arc<dyn KeyServer>,
}

impl CorruptingKeyServer {
    /// Wrap an honest server
    pub fn new(inner: Arc<dyn KeyServer>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl KeyServer for CorruptingKeyServer {
    fn id(&self) -> KeyServerId {
        self.inner.id()
    }

    async fn request_share(&self, request: &ShareRequest) -> Result<ShareOutcome> {
        match self.inner.request_share(request).await? {
            ShareOutcome::Granted(mut shares) => {
                for share in &mut shares {
                    share.point += generator();
                }
                Ok(ShareOutcome::Granted(shares))
            }
            refused => Ok(refused),
        }
    }
}

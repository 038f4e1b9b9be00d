//! Key server interface and the in-process implementation

use crate::committee::KeyServerSecret;
use crate::protocol::{ShareOutcome, ShareRequest};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::effects::{PhysicalTimeEffects, RandomEffects};
use tessera_core::{ErrorKind, KeyServerId, LedgerConfig, Result, TesseraError};
use tessera_crypto::{rng_from_seed, Encapsulation, SecretKeyShare};
use tessera_ledger::PolicyLedgerClient;
use tracing::{debug, warn};

/// One member of the key-server committee.
///
/// `Ok(Refused)` means the server answered and declined; `Err` means it
/// could not answer at all (transport failure, ledger outage).
#[async_trait]
pub trait KeyServer: Send + Sync {
    /// Committee id of this server
    fn id(&self) -> KeyServerId;

    /// Ask for decryption shares of the request's ciphertext
    async fn request_share(&self, request: &ShareRequest) -> Result<ShareOutcome>;
}

/// Key server holding its shares in process memory
pub struct LocalKeyServer {
    id: KeyServerId,
    shares: Vec<SecretKeyShare>,
    ledger: Arc<dyn PolicyLedgerClient>,
    time: Arc<dyn PhysicalTimeEffects>,
    random: Arc<dyn RandomEffects>,
    ledger_timeout: Duration,
}

impl LocalKeyServer {
    /// Load a server from its secret material
    pub fn new(
        secret: &KeyServerSecret,
        ledger: Arc<dyn PolicyLedgerClient>,
        time: Arc<dyn PhysicalTimeEffects>,
        random: Arc<dyn RandomEffects>,
        ledger_config: &LedgerConfig,
    ) -> Result<Self> {
        let shares = secret.key_shares()?;
        if shares.is_empty() {
            return Err(TesseraError::invalid(format!(
                "key server {} holds no shares",
                secret.id
            )));
        }
        Ok(Self {
            id: secret.id,
            shares,
            ledger,
            time,
            random,
            ledger_timeout: ledger_config.check_timeout(),
        })
    }

    /// Share indices held
    pub fn indices(&self) -> Vec<u32> {
        self.shares.iter().map(SecretKeyShare::index).collect()
    }

    /// Run every check a share release depends on
    async fn authorize(&self, request: &ShareRequest) -> Result<Encapsulation> {
        let tx = request.transaction()?;
        let certificate = &request.certificate;

        certificate.verify(self.time.now_ms().await)?;
        if certificate.package_id != tx.package_id {
            return Err(TesseraError::invalid_session(format!(
                "session is scoped to package {}, request names {}",
                certificate.package_id, tx.package_id
            )));
        }
        certificate.verify_request(&request.signing_payload(), &request.request_signature)?;

        let encapsulation = request.decode_encapsulation()?;
        if !encapsulation.verify(tx.key_identity.as_bytes()) {
            return Err(TesseraError::corrupt_ciphertext(format!(
                "header is not bound to key identity {}",
                tx.key_identity
            )));
        }

        tokio::time::timeout(
            self.ledger_timeout,
            self.ledger.simulate_approval(&tx, &certificate.principal_id),
        )
        .await
        .map_err(|_| {
            TesseraError::key_server_unreachable(format!(
                "{}: ledger check timed out after {:?}",
                self.id, self.ledger_timeout
            ))
        })??;

        Ok(encapsulation)
    }
}

#[async_trait]
impl KeyServer for LocalKeyServer {
    fn id(&self) -> KeyServerId {
        self.id
    }

    async fn request_share(&self, request: &ShareRequest) -> Result<ShareOutcome> {
        let encapsulation = match self.authorize(request).await {
            Ok(encapsulation) => encapsulation,
            Err(e) if e.is_retryable() || e.kind() == ErrorKind::Ledger => return Err(e),
            Err(e) => {
                warn!(server = %self.id, principal = %request.certificate.principal_id, error = %e, "share refused");
                return Ok(ShareOutcome::refused(&e));
            }
        };

        let mut rng = rng_from_seed(self.random.random_bytes_32().await);
        let shares = self
            .shares
            .iter()
            .map(|share| share.decryption_share(&encapsulation, &mut rng))
            .collect::<Vec<_>>();
        debug!(server = %self.id, principal = %request.certificate.principal_id, shares = shares.len(), "shares released");
        Ok(ShareOutcome::Granted(shares))
    }
}

impl fmt::Debug for LocalKeyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyServer")
            .field("id", &self.id)
            .field("indices", &self.indices())
            .finish_non_exhaustive()
    }
}

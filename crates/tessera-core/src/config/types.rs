//! Configuration sections

use super::traits::{ConfigLoader, ConfigValidation};
use crate::identifiers::KeyServerId;
use crate::{Result, TesseraError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "TESSERA_";

/// Top-level configuration for the secure-content core
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    /// Threshold parameters and key-server committee
    pub threshold: ThresholdConfig,
    /// Key-server fan-out deadlines
    pub pool: PoolConfig,
    /// Session credential lifetimes
    pub session: SessionConfig,
    /// Blob storage parameters
    pub storage: StorageConfig,
    /// Ledger call parameters
    pub ledger: LedgerConfig,
}

/// One configured key server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyServerEntry {
    /// Ledger id of the key server
    pub id: KeyServerId,
    /// Number of share indices the server holds
    #[serde(default = "default_weight")]
    pub weight: u8,
    /// Endpoint, when the server is remote
    #[serde(default)]
    pub url: Option<String>,
}

fn default_weight() -> u8 {
    1
}

/// Threshold parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Minimum number of share indices needed to decrypt
    pub threshold: u16,
    /// Number of weight-1 servers to deal when `key_servers` is empty
    pub committee_size: u8,
    /// Explicit committee; overrides `committee_size`
    pub key_servers: Vec<KeyServerEntry>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            committee_size: 3,
            key_servers: Vec::new(),
        }
    }
}

impl ThresholdConfig {
    /// Total share weight of the configured committee
    pub fn total_weight(&self) -> u32 {
        if self.key_servers.is_empty() {
            u32::from(self.committee_size)
        } else {
            self.key_servers.iter().map(|s| u32::from(s.weight)).sum()
        }
    }
}

impl ConfigValidation for ThresholdConfig {
    fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(TesseraError::invalid("threshold must be at least 1"));
        }
        if self.key_servers.iter().any(|s| s.weight == 0) {
            return Err(TesseraError::invalid("key server weight must be at least 1"));
        }
        let total = self.total_weight();
        if u32::from(self.threshold) > total {
            return Err(TesseraError::invalid(format!(
                "threshold {} exceeds total key server weight {}",
                self.threshold, total
            )));
        }
        let mut ids: Vec<_> = self.key_servers.iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();
        if ids.len() != self.key_servers.len() {
            return Err(TesseraError::invalid("duplicate key server id"));
        }
        Ok(())
    }
}

/// Key-server fan-out parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Deadline for a single share request
    pub request_timeout_ms: u64,
    /// Deadline for reaching quorum across the whole pool
    pub quorum_timeout_ms: u64,
    /// Cryptographically invalid shares tolerated before giving up
    pub max_invalid_shares: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            quorum_timeout_ms: 10_000,
            max_invalid_shares: 1,
        }
    }
}

impl PoolConfig {
    /// Per-request deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whole fan-out deadline
    pub fn quorum_timeout(&self) -> Duration {
        Duration::from_millis(self.quorum_timeout_ms)
    }
}

impl ConfigValidation for PoolConfig {
    fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 || self.quorum_timeout_ms == 0 {
            return Err(TesseraError::invalid("pool timeouts must be non-zero"));
        }
        Ok(())
    }
}

/// Session credential lifetimes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// TTL used when the caller does not pick one
    pub default_ttl_secs: u64,
    /// Upper bound on any requested TTL
    pub max_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 600,
            max_ttl_secs: 3_600,
        }
    }
}

impl ConfigValidation for SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.default_ttl_secs == 0 || self.max_ttl_secs == 0 {
            return Err(TesseraError::invalid("session TTLs must be non-zero"));
        }
        if self.default_ttl_secs > self.max_ttl_secs {
            return Err(TesseraError::invalid(format!(
                "default session TTL {}s exceeds maximum {}s",
                self.default_ttl_secs, self.max_ttl_secs
            )));
        }
        Ok(())
    }
}

/// How storage-network writes are signed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SigningConfig {
    /// The service holds a storage key
    ServerManaged {
        /// Base64 Ed25519 secret key (32 bytes, optionally prefixed by the scheme flag)
        keypair: String,
    },
    /// The caller supplies a signer at construction
    #[default]
    UserManaged,
}

impl SigningConfig {
    /// Decode the server-managed secret key
    pub fn server_secret_key(&self) -> Result<Option<[u8; 32]>> {
        match self {
            SigningConfig::UserManaged => Ok(None),
            SigningConfig::ServerManaged { keypair } => {
                let raw = STANDARD.decode(keypair.trim()).map_err(|e| {
                    TesseraError::invalid(format!("storage keypair is not base64: {e}"))
                })?;
                let secret = match raw.len() {
                    32 => &raw[..],
                    33 if raw[0] == 0x00 => &raw[1..],
                    n => {
                        return Err(TesseraError::invalid(format!(
                            "storage keypair must be 32 bytes (or 33 with flag), got {n}"
                        )))
                    }
                };
                let mut out = [0u8; 32];
                out.copy_from_slice(secret);
                Ok(Some(out))
            }
        }
    }
}

/// Blob storage parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage epochs a new blob stays readable
    pub epochs: u32,
    /// Whether new blobs may later be deleted
    pub deletable: bool,
    /// Deadline for a blob write
    pub write_timeout_ms: u64,
    /// Deadline for a blob read
    pub read_timeout_ms: u64,
    /// Signing strategy for writes
    pub signing: SigningConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            epochs: 3,
            deletable: false,
            write_timeout_ms: 30_000,
            read_timeout_ms: 10_000,
            signing: SigningConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Write deadline
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Read deadline
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl ConfigValidation for StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TesseraError::invalid("storage epochs must be at least 1"));
        }
        if self.write_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(TesseraError::invalid("storage timeouts must be non-zero"));
        }
        self.signing.server_secret_key()?;
        Ok(())
    }
}

/// Ledger call parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Deadline for a policy check or ledger transaction
    pub check_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: 5_000,
        }
    }
}

impl LedgerConfig {
    /// Ledger call deadline
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}

impl ConfigValidation for LedgerConfig {
    fn validate(&self) -> Result<()> {
        if self.check_timeout_ms == 0 {
            return Err(TesseraError::invalid("ledger timeout must be non-zero"));
        }
        Ok(())
    }
}

impl TesseraConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TesseraError::internal(format!("failed to render config: {e}")))
    }
}

impl ConfigValidation for TesseraConfig {
    fn validate(&self) -> Result<()> {
        self.threshold.validate()?;
        self.pool.validate()?;
        self.session.validate()?;
        self.storage.validate()?;
        self.ledger.validate()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TesseraError::invalid(format!("{ENV_PREFIX}{name} has invalid value {value:?}")))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ConfigLoader for TesseraConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TesseraError::invalid(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut server_ids: Option<Vec<String>> = None;
        let mut server_urls: Option<Vec<String>> = None;

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "THRESHOLD" => self.threshold.threshold = parse_var(name, &value)?,
                "COMMITTEE_SIZE" => self.threshold.committee_size = parse_var(name, &value)?,
                "KEY_SERVER_IDS" => server_ids = Some(split_list(&value)),
                "KEY_SERVER_URLS" => server_urls = Some(split_list(&value)),
                "POOL_REQUEST_TIMEOUT_MS" => {
                    self.pool.request_timeout_ms = parse_var(name, &value)?;
                }
                "POOL_QUORUM_TIMEOUT_MS" => self.pool.quorum_timeout_ms = parse_var(name, &value)?,
                "POOL_MAX_INVALID_SHARES" => {
                    self.pool.max_invalid_shares = parse_var(name, &value)?;
                }
                "SESSION_DEFAULT_TTL_SECS" => {
                    self.session.default_ttl_secs = parse_var(name, &value)?;
                }
                "SESSION_MAX_TTL_SECS" => self.session.max_ttl_secs = parse_var(name, &value)?,
                "STORAGE_EPOCHS" => self.storage.epochs = parse_var(name, &value)?,
                "STORAGE_DELETABLE" => self.storage.deletable = parse_var(name, &value)?,
                "KEYPAIR" => {
                    self.storage.signing = SigningConfig::ServerManaged {
                        keypair: value.trim().to_string(),
                    };
                }
                "LEDGER_CHECK_TIMEOUT_MS" => {
                    self.ledger.check_timeout_ms = parse_var(name, &value)?;
                }
                other => tracing::debug!(variable = other, "Ignoring unknown TESSERA_ variable"),
            }
        }

        // Ids and urls only override the committee when both are present and aligned.
        if let (Some(ids), Some(urls)) = (server_ids, server_urls) {
            if ids.len() != urls.len() {
                return Err(TesseraError::invalid(format!(
                    "{ENV_PREFIX}KEY_SERVER_IDS has {} entries but {ENV_PREFIX}KEY_SERVER_URLS has {}",
                    ids.len(),
                    urls.len()
                )));
            }
            self.threshold.key_servers = ids
                .iter()
                .zip(urls)
                .map(|(id, url)| {
                    Ok(KeyServerEntry {
                        id: id.parse()?,
                        weight: 1,
                        url: Some(url),
                    })
                })
                .collect::<Result<_>>()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = TesseraConfig::default();
        config.validate().unwrap();
        assert_eq!(config.threshold.threshold, 2);
        assert_eq!(config.storage.epochs, 3);
        assert!(!config.storage.deletable);
        assert_eq!(config.session.default_ttl_secs, 600);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TesseraConfig::from_toml_str(
            r#"
            [threshold]
            threshold = 3
            committee_size = 5

            [storage]
            epochs = 7
            signing = { mode = "user_managed" }
            "#,
        )
        .unwrap();
        assert_eq!(config.threshold.threshold, 3);
        assert_eq!(config.threshold.committee_size, 5);
        assert_eq!(config.storage.epochs, 7);
        assert_eq!(config.pool, PoolConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_threshold_above_weight_is_rejected() {
        let mut config = TesseraConfig::default();
        config.threshold.threshold = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_ttl_above_max_is_rejected() {
        let mut config = TesseraConfig::default();
        config.session.default_ttl_secs = 7_200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TesseraConfig::default();
        config
            .merge_with_vars(vars(&[
                ("TESSERA_THRESHOLD", "1"),
                ("TESSERA_STORAGE_EPOCHS", "9"),
                ("TESSERA_STORAGE_DELETABLE", "true"),
                ("HOME", "/root"),
            ]))
            .unwrap();
        assert_eq!(config.threshold.threshold, 1);
        assert_eq!(config.storage.epochs, 9);
        assert!(config.storage.deletable);
    }

    #[test]
    fn test_env_key_servers_need_matching_urls() {
        let mut config = TesseraConfig::default();
        let err = config
            .merge_with_vars(vars(&[
                ("TESSERA_KEY_SERVER_IDS", "0x1,0x2"),
                ("TESSERA_KEY_SERVER_URLS", "https://a.example"),
            ]))
            .unwrap_err();
        assert!(err.to_string().contains("KEY_SERVER_URLS"));

        config
            .merge_with_vars(vars(&[
                ("TESSERA_KEY_SERVER_IDS", "0x1, 0x2"),
                ("TESSERA_KEY_SERVER_URLS", "https://a.example,https://b.example"),
            ]))
            .unwrap();
        assert_eq!(config.threshold.key_servers.len(), 2);
        assert_eq!(config.threshold.total_weight(), 2);
    }

    #[test]
    fn test_server_managed_keypair_decoding() {
        let signing = SigningConfig::ServerManaged {
            keypair: STANDARD.encode([5u8; 32]),
        };
        assert_eq!(signing.server_secret_key().unwrap(), Some([5u8; 32]));

        let mut flagged = vec![0u8];
        flagged.extend_from_slice(&[6u8; 32]);
        let signing = SigningConfig::ServerManaged {
            keypair: STANDARD.encode(flagged),
        };
        assert_eq!(signing.server_secret_key().unwrap(), Some([6u8; 32]));

        let signing = SigningConfig::ServerManaged {
            keypair: "not base64!".into(),
        };
        assert!(signing.server_secret_key().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = TesseraConfig::default();
        config.storage.signing = SigningConfig::ServerManaged {
            keypair: STANDARD.encode([1u8; 32]),
        };
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(TesseraConfig::from_toml_str(&rendered).unwrap(), config);
    }
}

//! Configuration system
//!
//! `TesseraConfig` is loaded once from TOML, overlaid with `TESSERA_*`
//! environment variables, validated, and then handed to constructors.
//! Nothing below the binary reads the environment at call time.

pub mod traits;
pub mod types;

pub use traits::{ConfigLoader, ConfigValidation};
pub use types::{
    KeyServerEntry, LedgerConfig, PoolConfig, SessionConfig, SigningConfig, StorageConfig,
    TesseraConfig, ThresholdConfig,
};

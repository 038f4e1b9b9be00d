//! Tessera Core - foundation layer
//!
//! Shared vocabulary for the secure-content subsystem: ledger and content
//! identifiers, the unified error taxonomy, effect interfaces for randomness
//! and time, and the configuration model. This crate has no knowledge of
//! cryptography, key servers or storage backends.

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Content hashing (single algorithm choice)
pub mod hash;

/// Ledger, content and session identifiers
pub mod identifiers;

/// Pure effect interfaces (no implementations)
pub mod effects;

/// Configuration model and loading
pub mod config;

pub use config::{
    ConfigLoader, ConfigValidation, KeyServerEntry, LedgerConfig, PoolConfig, SessionConfig,
    SigningConfig, StorageConfig, TesseraConfig, ThresholdConfig,
};
pub use effects::{PhysicalTimeEffects, RandomEffects};
pub use errors::{ErrorKind, Result, TesseraError};
pub use identifiers::{
    BlobId, KeyServerId, ObjectHandle, PackageId, PolicyId, PrincipalId, SecretId, SessionHandle,
};

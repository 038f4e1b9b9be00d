//! Tessera vault
//!
//! The only surface the rest of an application calls. `store` encrypts a
//! payload under a policy and writes the ciphertext to blob storage;
//! `retrieve` reads it back and decrypts it with shares released by the
//! key-server committee to a signed, unexpired session.

pub mod builder;
pub mod engine;
pub mod service;

pub use builder::ServiceBuilder;
pub use engine::ThresholdCryptoEngine;
pub use service::{SecureContentService, StoredSecret};

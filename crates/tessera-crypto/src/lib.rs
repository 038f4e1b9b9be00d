//! Tessera threshold cryptography
//!
//! Identity-bound threshold encryption to a committee of key servers:
//!
//! - [`shamir`]: Shamir dealing and Lagrange interpolation
//! - [`tdh`]: labeled threshold ElGamal encapsulation with verifiable shares
//! - [`dleq`]: Chaum-Pedersen share-correctness proofs
//! - [`aead`]: payload sealing under the derived content key
//! - [`object`]: the self-describing ciphertext format
//! - [`dealer`]: weighted committee key generation
//! - [`envelope`]: end-to-end encrypt and combine-then-decrypt

pub mod aead;
pub mod dealer;
pub mod dleq;
pub mod envelope;
pub mod group;
pub mod identity;
pub mod object;
pub mod shamir;
pub mod tdh;

pub use dealer::{deal, indices_for, DealtKeys};
pub use dleq::DleqProof;
pub use group::rng_from_seed;
pub use envelope::{decrypt, encrypt, SealParams};
pub use identity::{KeyIdentity, KEY_NONCE_LEN};
pub use object::{EncryptedObject, KeyServerRef, FORMAT_VERSION};
pub use tdh::{combine_shares, DecryptionShare, Encapsulation, MasterPublicKey, SecretKeyShare};

pub use curve25519_dalek::ristretto::RistrettoPoint;
pub use rand_chacha::ChaCha20Rng;

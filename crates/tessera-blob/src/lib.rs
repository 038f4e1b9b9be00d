//! Tessera blob storage
//!
//! Opaque ciphertext is written to a content-addressed storage network: the
//! blob id is the hash of the bytes, so re-writing identical bytes yields the
//! same id. Each write also registers a ledger object handle carrying the
//! expiry (in storage epochs) and the deletable flag. Writes are signed with
//! a storage key chosen by a [`SigningStrategy`], never the user's session.

pub mod memory;
pub mod signing;
pub mod store;

pub use memory::MemoryBlobStore;
pub use signing::{Ed25519StorageSigner, SigningStrategy, StorageSigner};
pub use store::{BlobReceipt, BlobStore, WriteOptions};

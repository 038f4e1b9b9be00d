//! Tessera key servers
//!
//! Each key server holds one or more Shamir shares of the committee's master
//! secret. Before releasing a decryption share it verifies the caller's
//! session certificate, checks the ciphertext header under the requested key
//! identity, and dry-runs the approval transaction against the policy ledger.
//!
//! [`KeyServerPool`] fans a request out to the whole committee, verifies every
//! share it gets back and stops as soon as a quorum is reached.

pub mod committee;
pub mod pool;
pub mod protocol;
pub mod server;

pub use committee::{
    generate_committee, CommitteeDescriptor, CommitteeMember, KeyServerSecret, ShareSecret,
    VerificationKey,
};
pub use pool::{KeyServerPool, ShareCollection};
pub use protocol::{ServerResult, ShareOutcome, ShareRequest};
pub use server::{KeyServer, LocalKeyServer};

//! Tessera policy ledger
//!
//! Access-control policies live on an external ledger as membership lists.
//! This crate defines the client interface the rest of Tessera talks to,
//! the approval transaction key servers simulate before releasing a share,
//! and an in-memory ledger used by tests and the demo.

pub mod client;
pub mod memory;
pub mod transaction;

pub use client::{Policy, PolicyLedgerClient};
pub use memory::MemoryLedger;
pub use transaction::ApprovalTransaction;

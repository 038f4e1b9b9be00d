//! Tessera testing infrastructure
//!
//! Deterministic effect handlers, principal fixtures, misbehaving key
//! servers and a harness that wires the whole stack in process.
//!
//! ```toml
//! [dev-dependencies]
//! tessera-testkit = { path = "../tessera-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod harness;
pub mod keyservers;
pub mod random;
pub mod time;

pub use fixtures::Principal;
pub use harness::{HarnessBuilder, ServerBehavior, VaultHarness};
pub use keyservers::{
    CorruptingKeyServer, CountingKeyServer, OfflineKeyServer, RefusingKeyServer, StalledKeyServer,
};
pub use random::SeededRandomHandler;
pub use time::ControllableClock;

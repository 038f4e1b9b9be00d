//! Tessera Effects - production handlers
//!
//! Stateless implementations of the effect traits declared in
//! `tessera-core`. Controllable handlers for tests live in
//! `tessera-testkit`, not here.

#![forbid(unsafe_code)]

pub mod random;
pub mod time;

pub use random::RealRandomHandler;
pub use time::RealTimeHandler;

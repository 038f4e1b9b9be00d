//! Effect interfaces
//!
//! Pure trait signatures for the side effects the secure-content core needs:
//! randomness and wall-clock time. Production handlers live in
//! `tessera-effects`; controllable handlers for tests live in
//! `tessera-testkit`. Components receive these as `Arc<dyn _>` at
//! construction so nothing reaches for ambient global state.

pub mod random;
pub mod time;

pub use random::RandomEffects;
pub use time::PhysicalTimeEffects;

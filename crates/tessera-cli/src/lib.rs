//! Tessera CLI library
//!
//! Command implementations behind the `tessera` binary, kept in a library so
//! they can be driven from tests.

/// Command handlers
pub mod commands;

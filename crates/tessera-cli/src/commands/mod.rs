// Command modules for the CLI

use tessera_core::{KeyServerEntry, KeyServerId, ThresholdConfig};

/// Configuration loading and validation
pub mod check_config;

/// In-process end-to-end scenario
pub mod demo;

/// Committee dealing
pub mod keygen;

/// Committee members named by the configuration.
///
/// An explicit `key_servers` list wins; otherwise `committee_size` weight-1
/// servers are named `key-server-{i}`.
pub fn committee_entries(threshold: &ThresholdConfig) -> Vec<KeyServerEntry> {
    if !threshold.key_servers.is_empty() {
        return threshold.key_servers.clone();
    }
    (0..threshold.committee_size)
        .map(|i| KeyServerEntry {
            id: KeyServerId::derive(format!("key-server-{i}").as_bytes()),
            weight: 1,
            url: None,
        })
        .collect()
}

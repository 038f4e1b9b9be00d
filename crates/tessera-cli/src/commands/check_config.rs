//! Load and validate a configuration file

use anyhow::{Context, Result};
use std::path::Path;
use tessera_core::{ConfigLoader, SigningConfig, TesseraConfig};
use tracing::info;

/// Load `path`, overlay `TESSERA_*` variables and validate
pub fn run(path: &Path) -> Result<TesseraConfig> {
    let config = TesseraConfig::load(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;

    let signing = match config.storage.signing {
        SigningConfig::ServerManaged { .. } => "server_managed",
        SigningConfig::UserManaged => "user_managed",
    };
    info!(
        threshold = config.threshold.threshold,
        total_weight = config.threshold.total_weight(),
        epochs = config.storage.epochs,
        signing,
        "configuration ok"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessera.toml");
        std::fs::write(&path, "[threshold]\nthreshold = 2\ncommittee_size = 4\n").unwrap();

        let config = run(&path).unwrap();
        assert_eq!(config.threshold.committee_size, 4);
    }

    #[test]
    fn test_threshold_above_committee_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessera.toml");
        std::fs::write(&path, "[threshold]\nthreshold = 5\ncommittee_size = 3\n").unwrap();

        let err = run(&path).unwrap_err();
        assert!(format!("{err:#}").contains("exceeds"));
    }
}

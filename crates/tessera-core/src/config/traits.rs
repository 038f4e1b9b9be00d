//! Core configuration traits

use crate::Result;
use std::path::Path;

/// Validation of a configuration section
pub trait ConfigValidation {
    /// Check invariants that serde cannot express
    fn validate(&self) -> Result<()>;
}

/// Loading pipeline for a top-level configuration
pub trait ConfigLoader: ConfigValidation + Sized {
    /// Parse configuration from a file
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Overlay values from `(name, value)` pairs using the `TESSERA_` convention
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Overlay values from the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Load from file, overlay the environment, then validate
    fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_from_file(path)?;
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

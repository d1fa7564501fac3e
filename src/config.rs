//! Store configuration with defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the sled database.
    pub path: PathBuf,
    /// Remove the database when the service is dropped.
    pub temporary: bool,
    /// Flush to disk after every successful save.
    pub flush_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("shipments.db"),
            temporary: false,
            flush_on_write: true,
        }
    }
}

impl StoreConfig {
    /// Reads a JSON config file, returning defaults when the file does not exist.
    /// Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no store config, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn sled_config(&self) -> sled::Config {
        sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary)
    }
}

//! Path layer configuration.
//!
//! ```toml
//! max_idle_per_backend = 256
//! follow_links = true
//! null_device = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for [`PathFactory`](crate::PathFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Released entries kept per backend for reuse; the rest are dropped.
    pub max_idle_per_backend: usize,
    /// Acquired entries stat through symlinks.
    pub follow_links: bool,
    /// Route `/dev/null` paths to the null driver. When false they are
    /// plain POSIX paths.
    pub null_device: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_idle_per_backend: 1024,
            follow_links: false,
            null_device: true,
        }
    }
}

impl PathConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

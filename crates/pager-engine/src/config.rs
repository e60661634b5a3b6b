//! Loader configuration.
//!
//! Read from TOML; every field has a default, so an empty file is valid:
//!
//! ```toml
//! debounce_ms = 300
//!
//! [empty]
//! label = "Nothing matches"
//!
//! [item_cache]
//! capacity = 64
//! ttl_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use pager_cache::ItemCacheConfig;
use pager_model::EmptyState;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// LOADER CONFIG
// =============================================================================

/// Settings shared by data loaders, search loaders and item loaders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Debounce delay for search and auto-reload, in milliseconds.
    pub debounce_ms: u64,

    /// What to show when a load returns no results.
    pub empty: EmptyState,

    /// Bounds for single-item caches.
    pub item_cache: ItemCacheConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            empty: EmptyState::default(),
            item_cache: ItemCacheConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render the config as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(io_error)
    }

    /// The debounce delay as a duration.
    pub const fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

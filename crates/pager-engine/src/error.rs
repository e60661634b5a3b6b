//! Error types for the engine crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or writing a [`LoaderConfig`](crate::LoaderConfig).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Config file could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for the config shape.
    #[error("invalid loader config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be rendered as TOML.
    #[error("failed to serialize loader config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    /// Get a user-friendly message with a suggestion.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { path, .. } => {
                format!("Could not access {}. Check the path and permissions.", path.display())
            }
            Self::Parse(err) => format!("The config file is not valid: {}", err.message()),
            Self::Serialize(_) => "The config could not be saved.".to_string(),
        }
    }
}

//! Settings loading errors

use cellar_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for settings loading
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Why settings could not be loaded
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("Failed to read settings file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML
    #[error("Failed to parse settings file '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// Merged values do not fit the settings shape
    #[error("Invalid settings: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Values are well-formed but unusable
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

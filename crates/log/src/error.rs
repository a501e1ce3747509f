//! Error handling for cellar-log

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Result with [`LogError`]
pub type LogResult<T> = Result<T, LogError>;

/// Logger setup errors
#[derive(Debug, Error)]
pub enum LogError {
    /// Filter directive could not be parsed
    #[error("Invalid filter '{filter}': {reason}")]
    Filter {
        /// The directive as configured
        filter: String,
        /// Parser message
        reason: String,
    },

    /// Format is neither `text` nor `json`
    #[error("unknown log format {0}")]
    Format(String),

    /// Log directory or file could not be prepared
    #[error("Unable to open log file in directory '{}': {source}", path.display())]
    Io {
        /// Log directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

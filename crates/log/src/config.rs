//! Logging settings

use crate::error::{LogError, LogResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `debug,redis=warn`. `RUST_LOG` wins when set.
    pub level: String,

    /// `text` or `json`
    pub format: String,

    /// Write to stdout
    pub enable_stdout: bool,

    /// Absolute directory for `cellar-YYYY-MM-DD.log`; empty disables file output
    pub directory: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            enable_stdout: true,
            directory: PathBuf::new(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact single-line output
    Text,
    /// Structured JSON output
    Json,
}

impl LoggingSettings {
    /// Parse the configured format, case-insensitively.
    pub fn log_format(&self) -> LogResult<LogFormat> {
        match self.format.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::Format(other.to_string())),
        }
    }

    /// Directory for the log file, if file output is configured.
    ///
    /// Relative paths are not accepted and yield `None`.
    pub fn log_directory(&self) -> Option<&Path> {
        let dir = self.directory.as_path();
        (!dir.as_os_str().is_empty() && dir.is_absolute()).then_some(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("text", LogFormat::Text)]
    #[case("TEXT", LogFormat::Text)]
    #[case("json", LogFormat::Json)]
    fn parses_format(#[case] raw: &str, #[case] expected: LogFormat) {
        let settings = LoggingSettings {
            format: raw.into(),
            ..LoggingSettings::default()
        };
        assert_eq!(settings.log_format().unwrap(), expected);
    }

    #[test]
    fn unknown_format_is_an_error() {
        let settings = LoggingSettings {
            format: "logfmt".into(),
            ..LoggingSettings::default()
        };
        assert_eq!(
            settings.log_format().unwrap_err().to_string(),
            "unknown log format logfmt"
        );
    }

    #[test]
    fn relative_directory_is_ignored() {
        let settings = LoggingSettings {
            directory: PathBuf::from("logs"),
            ..LoggingSettings::default()
        };
        assert_eq!(settings.log_directory(), None);
        assert_eq!(LoggingSettings::default().log_directory(), None);
    }
}

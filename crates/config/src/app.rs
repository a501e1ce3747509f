//! Application-level settings

use serde::{Deserialize, Serialize};

/// Shortest `max_expiration_seconds` the service accepts
pub const MIN_MAX_EXPIRATION_SECONDS: i64 = 15 * 60;

/// Service addresses and secret limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Listen address for the HTTP layer
    pub bind_address: String,

    /// Public base URL handed to clients
    pub client_address: String,

    /// Reported by health checks
    pub version: String,

    pub max_file_size_mb: i64,
    pub max_access_count: i64,
    pub max_expiration_seconds: i64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            client_address: "http://127.0.0.1:8080".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            max_file_size_mb: 8,
            max_access_count: 100,
            max_expiration_seconds: 604_800,
        }
    }
}

impl AppSettings {
    /// File size limit in MiB, never negative. `0` disables the check.
    pub fn max_file_size_mb(&self) -> i64 {
        self.max_file_size_mb.max(0)
    }

    /// Largest access limit a caller may request, at least 1
    pub fn max_access_count(&self) -> i64 {
        self.max_access_count.max(1)
    }

    /// Longest secret lifetime, at least 15 minutes
    pub fn max_expiration_seconds(&self) -> i64 {
        self.max_expiration_seconds.max(MIN_MAX_EXPIRATION_SECONDS)
    }
}

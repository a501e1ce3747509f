//! The full settings tree

use crate::app::AppSettings;
use cellar_core::ConfigError;
use cellar_crypto::{CryptoBackend, CryptographyConfig};
use cellar_log::LoggingSettings;
use cellar_ratelimit::RateLimitConfig;
use cellar_storage::RedisConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to compose a Cellar process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub redis: RedisConfig,
    pub rate_limit: RateLimitConfig,
    pub cryptography: CryptographyConfig,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Check every section and resolve the crypto backend.
    pub fn validate(&self) -> Result<CryptoBackend, ConfigError> {
        self.redis.validate()?;
        self.logging
            .log_format()
            .map_err(|e| ConfigError::invalid("logging.format", e.to_string()))?;
        self.cryptography.backend()
    }
}

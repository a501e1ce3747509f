//! Redis connection settings.

use cellar_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection settings for the Redis backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl RedisConfig {
    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection URL. Contains the password; never log it.
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}/{}", self.address(), self.db)
        } else {
            format!("redis://:{}@{}/{}", self.password, self.address(), self.db)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::missing("redis.host"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("redis.port", "must not be 0"));
        }
        if self.db < 0 {
            return Err(ConfigError::invalid("redis.db", "must not be negative"));
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .finish()
    }
}

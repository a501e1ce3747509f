//! Redis backend.
//!
//! Multi-key writes and the sliding-window step are sent as `MULTI/EXEC`
//! pipelines so they apply atomically.

use crate::config::RedisConfig;
use crate::kv::{KeyValueStore, WindowSnapshot, ttl_seconds};
use async_trait::async_trait;
use cellar_core::{CellarError, Health, Result, StorageError};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::fmt;
use std::time::Duration;

const REDIS_VERSION_FIELD: &str = "redis_version";

/// Redis-backed [`KeyValueStore`].
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    address: String,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("address", &self.address)
            .finish()
    }
}

impl RedisStore {
    /// Connect and keep a multiplexed, self-reconnecting connection.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let address = config.address();
        if config.password.is_empty() {
            tracing::warn!(address = %address, "redis password is empty");
        }

        let client = redis::Client::open(config.url().as_str()).map_err(|e| {
            StorageError::Connection(format!("Failed to create Redis client: {e}"))
        })?;
        let manager = ConnectionManager::new(client).await.map_err(|e| {
            StorageError::Connection(format!("Failed to connect to Redis at {address}: {e}"))
        })?;

        tracing::info!(address = %address, db = config.db, "Initialized Redis store");
        Ok(Self { manager, address })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

fn command_error(operation: &'static str) -> impl FnOnce(redis::RedisError) -> CellarError {
    move |e| CellarError::storage(operation, e.to_string())
}

/// Pull the version out of an `INFO server` reply.
pub(crate) fn parse_redis_version(info: &str) -> Option<String> {
    info.lines()
        .map(str::trim_end)
        .find_map(|line| line.strip_prefix(REDIS_VERSION_FIELD)?.strip_prefix(':'))
        .map(str::to_owned)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &'static str {
        "Redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn();
        conn.get(key).await.map_err(command_error("GET"))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let mut conn = self.conn();
        cmd.query_async::<Vec<Option<String>>>(&mut conn)
            .await
            .map_err(command_error("MGET"))
    }

    async fn set_many_ex(&self, entries: &[(String, String)], ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(seconds)
                .ignore();
        }

        let mut conn = self.conn();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(command_error("SET"))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn();
        conn.incr(key, 1).await.map_err(command_error("INCR"))
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        let mut conn = self.conn();
        cmd.query_async::<u64>(&mut conn)
            .await
            .map_err(command_error("DEL"))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .query_async::<bool>(&mut conn)
            .await
            .map_err(command_error("EXPIRE"))
    }

    async fn slide_window(
        &self,
        key: &str,
        window_start_nanos: i64,
        now_nanos: i64,
        ttl: Duration,
    ) -> Result<WindowSnapshot> {
        let mut conn = self.conn();
        let (count_before_add, expiry_refreshed) = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(key)
            .arg(0)
            .arg(window_start_nanos)
            .ignore()
            .cmd("ZCARD")
            .arg(key)
            .cmd("ZADD")
            .arg(key)
            .arg(now_nanos)
            .arg(now_nanos)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .query_async::<(u64, bool)>(&mut conn)
            .await
            .map_err(command_error("rate limit pipeline"))?;

        Ok(WindowSnapshot {
            count_before_add,
            expiry_refreshed,
        })
    }

    async fn health(&self) -> Health {
        let mut conn = self.conn();
        match redis::cmd("INFO")
            .arg("server")
            .query_async::<String>(&mut conn)
            .await
        {
            Ok(info) => match parse_redis_version(&info) {
                Some(version) => Health::healthy(self.name(), version),
                None => Health::unhealthy(self.name()),
            },
            Err(e) => {
                tracing::warn!(address = %self.address, error = %e, "Redis health check failed");
                Health::unhealthy(self.name())
            }
        }
    }
}

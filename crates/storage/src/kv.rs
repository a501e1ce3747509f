//! Key-value backend abstraction.
//!
//! Cellar relies on a handful of primitives being atomic on the backend:
//! multi-key TTL writes, `INCR`, multi-key `DEL` and the sliding-window
//! pipeline. No in-process locking sits above them.

use async_trait::async_trait;
use cellar_core::{Health, Result};
use std::fmt;
use std::time::Duration;

/// Outcome of one sliding-window round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Entries left in the window after pruning, before this request was added
    pub count_before_add: u64,
    /// Whether the key's expiry was refreshed
    pub expiry_refreshed: bool,
}

/// Minimal atomic key-value interface.
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Backend display name used in health reports.
    fn name(&self) -> &'static str;

    /// Read one string value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Read several values in one round trip, preserving order.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Write all entries with the same TTL, atomically.
    async fn set_many_ex(&self, entries: &[(String, String)], ttl: Duration) -> Result<()>;

    /// Atomically increment an integer value, creating it at 0 if absent.
    /// An existing TTL is kept.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Set a key's TTL. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Sliding-window step on a sorted set, in one atomic round trip:
    /// drop members scored at or below `window_start_nanos`, count the rest,
    /// add `now_nanos` as both score and member, then set the key's TTL.
    async fn slide_window(
        &self,
        key: &str,
        window_start_nanos: i64,
        now_nanos: i64,
        ttl: Duration,
    ) -> Result<WindowSnapshot>;

    /// Reachability and backend version.
    async fn health(&self) -> Health;
}

/// Whole seconds for a TTL, never below one.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

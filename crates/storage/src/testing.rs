//! Test doubles for storage consumers.

use crate::kv::{KeyValueStore, WindowSnapshot};
use async_trait::async_trait;
use cellar_core::{CellarError, Health, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Wraps a real backend, counts calls and fails selected operations on demand.
#[derive(Debug)]
pub struct FlakyStore {
    inner: Arc<dyn KeyValueStore>,
    fail_on_write: AtomicBool,
    fail_on_incr: AtomicBool,
    fail_on_del: AtomicBool,
    fail_on_window: AtomicBool,
    stale_expiry: AtomicBool,
    write_count: AtomicU32,
    read_count: AtomicU32,
    incr_count: AtomicU32,
    del_count: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            fail_on_write: AtomicBool::new(false),
            fail_on_incr: AtomicBool::new(false),
            fail_on_del: AtomicBool::new(false),
            fail_on_window: AtomicBool::new(false),
            stale_expiry: AtomicBool::new(false),
            write_count: AtomicU32::new(0),
            read_count: AtomicU32::new(0),
            incr_count: AtomicU32::new(0),
            del_count: AtomicU32::new(0),
        }
    }

    /// Make the next batch write fail
    pub fn fail_next_write(&self) {
        self.fail_on_write.store(true, Ordering::SeqCst);
    }

    /// Make the next increment fail
    pub fn fail_next_incr(&self) {
        self.fail_on_incr.store(true, Ordering::SeqCst);
    }

    /// Make the next delete fail
    pub fn fail_next_del(&self) {
        self.fail_on_del.store(true, Ordering::SeqCst);
    }

    /// Make the next sliding-window step fail
    pub fn fail_next_window(&self) {
        self.fail_on_window.store(true, Ordering::SeqCst);
    }

    /// Report the next sliding-window expiry refresh as not applied
    pub fn stale_next_expiry(&self) {
        self.stale_expiry.store(true, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn incr_count(&self) -> u32 {
        self.incr_count.load(Ordering::SeqCst)
    }

    pub fn del_count(&self) -> u32 {
        self.del_count.load(Ordering::SeqCst)
    }
}

fn injected(operation: &'static str) -> CellarError {
    CellarError::storage(operation, "injected failure")
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.inner.get_many(keys).await
    }

    async fn set_many_ex(&self, entries: &[(String, String)], ttl: Duration) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_write.swap(false, Ordering::SeqCst) {
            return Err(injected("SET"));
        }
        self.inner.set_many_ex(entries, ttl).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.incr_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_incr.swap(false, Ordering::SeqCst) {
            return Err(injected("INCR"));
        }
        self.inner.incr(key).await
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.del_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_del.swap(false, Ordering::SeqCst) {
            return Err(injected("DEL"));
        }
        self.inner.del(keys).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn slide_window(
        &self,
        key: &str,
        window_start_nanos: i64,
        now_nanos: i64,
        ttl: Duration,
    ) -> Result<WindowSnapshot> {
        if self.fail_on_window.swap(false, Ordering::SeqCst) {
            return Err(injected("rate limit pipeline"));
        }
        let mut snapshot = self
            .inner
            .slide_window(key, window_start_nanos, now_nanos, ttl)
            .await?;
        if self.stale_expiry.swap(false, Ordering::SeqCst) {
            snapshot.expiry_refreshed = false;
        }
        Ok(snapshot)
    }

    async fn health(&self) -> Health {
        self.inner.health().await
    }
}

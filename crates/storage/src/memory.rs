//! In-process key-value backend.
//!
//! Every operation takes the single map lock, so multi-key operations are
//! atomic with respect to each other. Expiry is evaluated lazily against the
//! injected clock.

use crate::kv::{KeyValueStore, WindowSnapshot, ttl_seconds};
use async_trait::async_trait;
use cellar_core::{CellarError, Clock, Health, Result, SystemClock};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Version reported by [`MemoryStore::health`].
pub const MEMORY_STORE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    /// Sorted set whose members equal their scores.
    Window(BTreeSet<i64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Store driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a live key in whole seconds; `None` when absent or persistent.
    pub fn ttl(&self, key: &str) -> Option<i64> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        let entry = entries.get(key).filter(|e| e.is_live(now))?;
        entry.expires_at.map(|at| (at - now).num_seconds())
    }

    fn expiry(&self, now: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(ttl_seconds(ttl)).ok()?;
        now.checked_add_signed(TimeDelta::try_seconds(seconds)?)
    }

    fn purge(entries: &mut HashMap<String, Entry>, now: DateTime<Utc>) {
        entries.retain(|_, e| e.is_live(now));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(operation: &'static str, key: &str) -> CellarError {
    CellarError::storage(
        operation,
        format!("WRONGTYPE operation against key '{key}' holding the wrong kind of value"),
    )
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "Memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        match entries.get(key).filter(|e| e.is_live(now)) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type("GET", key)),
        }
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        // MGET reports non-string values as absent.
        Ok(keys
            .iter()
            .map(|key| match entries.get(key).filter(|e| e.is_live(now)) {
                Some(Entry {
                    value: Value::Str(s),
                    ..
                }) => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    async fn set_many_ex(&self, items: &[(String, String)], ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, ttl);
        let mut entries = self.entries.lock();
        Self::purge(&mut entries, now);
        for (key, value) in items {
            entries.insert(
                key.clone(),
                Entry {
                    value: Value::Str(value.clone()),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Self::purge(&mut entries, now);

        let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
            value: Value::Str("0".into()),
            expires_at: None,
        });
        let Value::Str(current) = &entry.value else {
            return Err(wrong_type("INCR", key));
        };
        let next = current
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| {
                CellarError::storage("INCR", "value is not an integer or out of range")
            })?;
        entry.value = Value::Str(next.to_string());
        Ok(next)
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Self::purge(&mut entries, now);
        Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count() as u64)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, ttl);
        let mut entries = self.entries.lock();
        Self::purge(&mut entries, now);
        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn slide_window(
        &self,
        key: &str,
        window_start_nanos: i64,
        now_nanos: i64,
        ttl: Duration,
    ) -> Result<WindowSnapshot> {
        let now = self.clock.now();
        let expires_at = self.expiry(now, ttl);
        let mut entries = self.entries.lock();
        Self::purge(&mut entries, now);

        let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
            value: Value::Window(BTreeSet::new()),
            expires_at: None,
        });
        let Value::Window(members) = &mut entry.value else {
            return Err(wrong_type("ZADD", key));
        };

        members.retain(|score| *score > window_start_nanos);
        let count_before_add = members.len() as u64;
        members.insert(now_nanos);
        entry.expires_at = expires_at;

        Ok(WindowSnapshot {
            count_before_add,
            expiry_refreshed: true,
        })
    }

    async fn health(&self) -> Health {
        Health::healthy(self.name(), MEMORY_STORE_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::ManualClock;
    use pretty_assertions::assert_eq;

    fn store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_owned(), v.to_owned())
    }

    #[tokio::test]
    async fn values_expire_with_ttl() {
        let (store, clock) = store();
        store
            .set_many_ex(&[pair("a", "1"), pair("b", "2")], Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.ttl("a"), Some(10));

        clock.advance(Duration::from_secs(9));
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn incr_keeps_ttl_and_creates_missing() {
        let (store, _) = store();
        store
            .set_many_ex(&[pair("n", "0")], Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.incr("n").await.unwrap(), 1);
        assert_eq!(store.incr("n").await.unwrap(), 2);
        assert_eq!(store.ttl("n"), Some(60));

        assert_eq!(store.incr("fresh").await.unwrap(), 1);
        assert_eq!(store.ttl("fresh"), None);
    }

    #[tokio::test]
    async fn incr_rejects_non_integer() {
        let (store, _) = store();
        store
            .set_many_ex(&[pair("s", "abc")], Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.incr("s").await.is_err());
    }

    #[tokio::test]
    async fn del_counts_existing_keys() {
        let (store, _) = store();
        store
            .set_many_ex(&[pair("a", "1")], Duration::from_secs(60))
            .await
            .unwrap();
        let removed = store.del(&["a".into(), "missing".into()]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.del(&["a".into()]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_many_preserves_order() {
        let (store, _) = store();
        store
            .set_many_ex(&[pair("a", "1"), pair("c", "3")], Duration::from_secs(60))
            .await
            .unwrap();
        let values = store
            .get_many(&["a".into(), "b".into(), "c".into()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some("1".into()), None, Some("3".into())]);
    }

    #[tokio::test]
    async fn slide_window_prunes_and_counts() {
        let (store, _) = store();
        let ttl = Duration::from_secs(60);

        let first = store.slide_window("w", 0, 100, ttl).await.unwrap();
        assert_eq!(first.count_before_add, 0);
        let second = store.slide_window("w", 0, 200, ttl).await.unwrap();
        assert_eq!(second.count_before_add, 1);

        // Members scored at or below the window start are dropped.
        let third = store.slide_window("w", 100, 300, ttl).await.unwrap();
        assert_eq!(third.count_before_add, 1);
        assert_eq!(store.ttl("w"), Some(60));
    }

    #[tokio::test]
    async fn window_key_rejects_string_ops() {
        let (store, _) = store();
        store
            .slide_window("w", 0, 1, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.get("w").await.is_err());
        assert!(store.incr("w").await.is_err());
    }

    #[tokio::test]
    async fn expire_reports_missing_keys() {
        let (store, _) = store();
        assert!(!store.expire("nope", Duration::from_secs(5)).await.unwrap());
    }
}

//! Concurrency behaviour of the secret store on the in-memory backend.
//!
//! Concurrent increments must hand out distinct counter values, and a
//! delete racing with reads must leave the secret absent.

use cellar_core::{ContentType, ManualClock, OperationContext, SecretId, SecretRecord};
use cellar_storage::{KeyValueStore, MemoryStore, SecretStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

const NOW: i64 = 1_700_000_000;

fn store() -> SecretStore {
    let clock = Arc::new(ManualClock::at_unix(NOW));
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_clock(clock.clone()));
    SecretStore::with_clock(kv, clock)
}

fn record(id: &str) -> SecretRecord {
    SecretRecord {
        id: SecretId::new(id),
        cipher_text: "cipher".into(),
        content_type: ContentType::Text,
        filename: None,
        access_count: 0,
        access_limit: 0,
        expiration_epoch: NOW + 3_600,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_distinct() {
    // GIVEN a stored secret
    let store = store();
    let ctx = OperationContext::new();
    store.write_secret(&ctx, &record("shared")).await.unwrap();

    // WHEN 32 tasks increment its access count at once
    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let store = store.clone();
        let ctx = ctx.clone();
        tasks.spawn(async move {
            store
                .increase_access_count(&ctx, &SecretId::new("shared"))
                .await
                .unwrap()
        });
    }
    let mut seen = BTreeSet::new();
    while let Some(count) = tasks.join_next().await {
        seen.insert(count.unwrap());
    }

    // THEN every task observed a different value, 1 through 32
    assert_eq!(seen, (1..=32).collect::<BTreeSet<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_wins_over_concurrent_reads() {
    // GIVEN a stored secret
    let store = store();
    let ctx = OperationContext::new();
    let id = SecretId::new("gone");
    store.write_secret(&ctx, &record("gone")).await.unwrap();

    // WHEN it is deleted while readers are running
    let mut readers = JoinSet::new();
    for _ in 0..8 {
        let store = store.clone();
        let ctx = ctx.clone();
        let id = id.clone();
        readers.spawn(async move { store.read_secret(&ctx, &id).await.unwrap() });
    }
    let deleted = store.delete_secret(&ctx, &id).await.unwrap();
    while let Some(read) = readers.join_next().await {
        // Each reader sees either the whole record or nothing.
        if let Some(found) = read.unwrap() {
            assert_eq!(found, record("gone"));
        }
    }

    // THEN the secret is gone for good
    assert!(deleted);
    assert_eq!(store.read_secret(&ctx, &id).await.unwrap(), None);
}

//! The wired engine end to end.

use cellar_core::{ManualClock, NewSecret, OperationContext};
use cellar_crypto::testing::InMemoryCrypto;
use cellar_ratelimit::{RateLimitConfig, Tier};
use cellar_secrets::{Cellar, Limits, SecretPolicy};
use cellar_storage::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000;

fn cellar(rate_limit: RateLimitConfig) -> (Cellar, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_unix(NOW));
    let cellar = Cellar::builder(
        Arc::new(MemoryStore::with_clock(clock.clone())),
        Arc::new(InMemoryCrypto::new()),
    )
    .policy(SecretPolicy {
        max_access_count: 5,
        ..SecretPolicy::default()
    })
    .rate_limit(rate_limit)
    .version("9.9.9")
    .clock(clock.clone())
    .build();
    (cellar, clock)
}

#[tokio::test]
async fn create_access_and_burn() {
    let (cellar, _) = cellar(RateLimitConfig::default());
    let ctx = OperationContext::new();

    let created = cellar
        .create_secret(&ctx, NewSecret::text("abc", NOW + 3600).with_access_limit(2))
        .await
        .unwrap();

    assert!(cellar.access_secret(&ctx, &created.id).await.unwrap().is_some());
    let metadata = cellar
        .get_secret_metadata(&ctx, &created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metadata.access_count, 1);

    assert!(cellar.access_secret(&ctx, &created.id).await.unwrap().is_some());
    assert!(cellar.access_secret(&ctx, &created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn limits_follow_policy() {
    let (cellar, _) = cellar(RateLimitConfig::default());
    assert_eq!(
        cellar.limits(),
        Limits {
            max_file_size_mb: 8,
            max_access_count: 5,
            max_expiration_seconds: 604_800,
        }
    );
}

#[tokio::test]
async fn health_reports_configured_version() {
    let (cellar, _) = cellar(RateLimitConfig::default());
    let report = cellar.get_health(&OperationContext::new()).await;
    assert_eq!(report.version, "9.9.9");
    assert_eq!(report.datastore.name, "Memory");
}

#[tokio::test]
async fn rate_limit_shares_the_datastore() {
    // GIVEN
    let (cellar, clock) = cellar(RateLimitConfig {
        tier1_requests_per_window: 1,
        ..RateLimitConfig::default()
    });
    let ctx = OperationContext::new();

    // WHEN
    let first = cellar.allow(&ctx, "caller", Tier::Tier1).await.unwrap();
    clock.advance(Duration::from_millis(1));
    let second = cellar.allow(&ctx, "caller", Tier::Tier1).await.unwrap();

    // THEN
    assert!(first.allowed);
    assert!(!second.allowed);
    assert_eq!(second.into_error().unwrap().retry_after_seconds(), Some(60));
}

#[tokio::test]
async fn disabled_rate_limit_never_denies() {
    let (cellar, clock) = cellar(RateLimitConfig {
        enabled: false,
        tier1_requests_per_window: 1,
        ..RateLimitConfig::default()
    });
    let ctx = OperationContext::new();

    for _ in 0..3 {
        assert!(cellar.allow(&ctx, "caller", Tier::Tier1).await.unwrap().allowed);
        clock.advance(Duration::from_millis(1));
    }
    assert!(!cellar.rate_limiter().is_enabled());
}

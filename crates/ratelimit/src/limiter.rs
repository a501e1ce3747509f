//! Sliding-window-log limiter.

use crate::config::RateLimitConfig;
use crate::result::RateLimitResult;
use crate::tier::Tier;
use async_trait::async_trait;
use cellar_core::{Clock, OperationContext, Result, SystemClock};
use cellar_storage::KeyValueStore;
use chrono::{DateTime, TimeDelta};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Storage key for one caller's window in one tier.
pub fn rate_limit_key(identifier: &str, tier: Tier) -> String {
    format!("cellar:ratelimit:{identifier}:{}", tier.name())
}

/// Request admission by caller and tier.
#[async_trait]
pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Record a request and decide whether it may proceed.
    ///
    /// Denial is a normal result, not an error; errors mean the backend
    /// could not be consulted.
    async fn allow(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        tier: Tier,
    ) -> Result<RateLimitResult>;

    /// Like [`allow`](Self::allow) but a denied request becomes
    /// [`CellarError::RateLimited`](cellar_core::CellarError::RateLimited).
    async fn acquire(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        tier: Tier,
    ) -> Result<RateLimitResult> {
        let result = self.allow(ctx, identifier, tier).await?;
        match result.clone().into_error() {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }
}

/// Sliding-window log over [`KeyValueStore::slide_window`].
///
/// Entries are pruned, counted, appended and the key's expiry refreshed in
/// one atomic round trip. Denied requests are recorded too, so a caller that
/// keeps hammering stays locked out.
pub struct SlidingWindowLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .finish()
    }
}

impl SlidingWindowLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, config: RateLimitConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        config: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        tracing::debug!(
            backend = store.name(),
            window_seconds = config.window_seconds(),
            enabled = config.enabled,
            "initializing rate limiter"
        );
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    #[tracing::instrument(skip(self, ctx), fields(tier = %tier))]
    async fn allow(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        tier: Tier,
    ) -> Result<RateLimitResult> {
        ctx.check()?;

        let limit = self.config.requests_per_window(tier);
        let window_seconds = self.config.window_seconds();
        let now_nanos = self.clock.unix_nanos();
        let now = DateTime::from_timestamp_nanos(now_nanos);
        let reset_at = now
            .checked_add_signed(TimeDelta::seconds(window_seconds as i64))
            .unwrap_or(now);

        if !self.config.enabled {
            return Ok(RateLimitResult {
                allowed: true,
                limit,
                remaining: limit,
                retry_after_seconds: 0,
                reset_at,
            });
        }

        let key = rate_limit_key(identifier, tier);
        let window_start =
            now_nanos.saturating_sub((window_seconds as i64).saturating_mul(NANOS_PER_SECOND));

        let snapshot = ctx
            .run(self.store.slide_window(
                &key,
                window_start,
                now_nanos,
                Duration::from_secs(window_seconds),
            ))
            .await?
            .inspect_err(|e| {
                tracing::error!(error = %e, redis_key = %key, "failed to execute rate limit pipeline");
            })?;

        if !snapshot.expiry_refreshed {
            tracing::warn!(redis_key = %key, "failed to set expiration");
        }

        let count = snapshot.count_before_add;
        let allowed = count < limit;
        let result = RateLimitResult {
            allowed,
            limit,
            remaining: limit.saturating_sub(count).saturating_sub(1),
            retry_after_seconds: if allowed { 0 } else { window_seconds },
            reset_at,
        };

        if !allowed {
            tracing::warn!(limit, count, "rate limit exceeded");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::ManualClock;
    use cellar_storage::MemoryStore;
    use pretty_assertions::assert_eq;

    fn limiter(config: RateLimitConfig) -> (SlidingWindowLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        (
            SlidingWindowLimiter::with_clock(store, config, clock.clone()),
            clock,
        )
    }

    #[test]
    fn key_layout() {
        assert_eq!(
            rate_limit_key("203.0.113.7", Tier::HealthCheck),
            "cellar:ratelimit:203.0.113.7:health"
        );
    }

    #[tokio::test]
    async fn first_request_reports_quota() {
        let (limiter, _) = limiter(RateLimitConfig::default());
        let result = limiter
            .allow(&OperationContext::new(), "caller", Tier::Tier1)
            .await
            .unwrap();

        assert_eq!(
            result,
            RateLimitResult {
                allowed: true,
                limit: 10,
                remaining: 9,
                retry_after_seconds: 0,
                reset_at: chrono::DateTime::from_timestamp(1_700_000_060, 0).unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn disabled_limiter_always_allows() {
        let config = RateLimitConfig {
            enabled: false,
            tier1_requests_per_window: 1,
            ..RateLimitConfig::default()
        };
        let (limiter, _) = limiter(config);
        let ctx = OperationContext::new();

        for _ in 0..5 {
            let result = limiter.allow(&ctx, "caller", Tier::Tier1).await.unwrap();
            assert!(result.allowed);
        }
    }

    #[tokio::test]
    async fn acquire_turns_denial_into_error() {
        let config = RateLimitConfig {
            tier2_requests_per_window: 1,
            ..RateLimitConfig::default()
        };
        let (limiter, clock) = limiter(config);
        let ctx = OperationContext::new();

        limiter.acquire(&ctx, "caller", Tier::Tier2).await.unwrap();
        clock.advance(Duration::from_millis(1));
        let err = limiter
            .acquire(&ctx, "caller", Tier::Tier2)
            .await
            .unwrap_err();
        assert_eq!(err.retry_after_seconds(), Some(60));
    }
}

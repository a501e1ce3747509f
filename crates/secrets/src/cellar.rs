//! Composition root.

use crate::lifecycle;
use crate::policy::{Limits, SecretPolicy};
use cellar_core::{
    Clock, HealthReport, NewSecret, OperationContext, Result, SecretContent, SecretId,
    SecretMetadata, SystemClock,
};
use cellar_crypto::CryptoProvider;
use cellar_ratelimit::{RateLimitConfig, RateLimitResult, RateLimiter, SlidingWindowLimiter, Tier};
use cellar_storage::{KeyValueStore, SecretStore};
use std::fmt;
use std::sync::Arc;

/// A wired Cellar engine: store, crypto provider, policy and rate limiter.
///
/// Everything is passed in explicitly; there is no process-wide state.
pub struct Cellar {
    store: SecretStore,
    crypto: Arc<dyn CryptoProvider>,
    limiter: SlidingWindowLimiter,
    policy: SecretPolicy,
    version: String,
}

impl fmt::Debug for Cellar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cellar")
            .field("datastore", &self.store.backend().name())
            .field("encryption", &self.crypto.name())
            .field("policy", &self.policy)
            .field("version", &self.version)
            .finish()
    }
}

/// Builder for [`Cellar`].
#[must_use]
pub struct CellarBuilder {
    kv: Arc<dyn KeyValueStore>,
    crypto: Arc<dyn CryptoProvider>,
    policy: SecretPolicy,
    rate_limit: RateLimitConfig,
    version: String,
    clock: Arc<dyn Clock>,
}

impl CellarBuilder {
    pub fn policy(mut self, policy: SecretPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Application version reported by health checks.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Time source shared by the store and the rate limiter.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Cellar {
        let store = SecretStore::with_clock(self.kv.clone(), self.clock.clone());
        let limiter = SlidingWindowLimiter::with_clock(self.kv, self.rate_limit, self.clock);
        tracing::info!(
            datastore = store.backend().name(),
            encryption = self.crypto.name(),
            version = %self.version,
            "Cellar initialized"
        );
        Cellar {
            store,
            crypto: self.crypto,
            limiter,
            policy: self.policy,
            version: self.version,
        }
    }
}

impl Cellar {
    pub fn builder(kv: Arc<dyn KeyValueStore>, crypto: Arc<dyn CryptoProvider>) -> CellarBuilder {
        CellarBuilder {
            kv,
            crypto,
            policy: SecretPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Connect to Redis and the configured crypto engine.
    ///
    /// `signer` is only needed for AWS-IAM or GCP-IAM Vault logins.
    #[cfg(feature = "redis")]
    pub async fn connect(
        settings: &cellar_config::Settings,
        signer: Option<Arc<dyn cellar_crypto::IamLoginSigner>>,
    ) -> Result<Self> {
        let backend = settings
            .cryptography
            .backend()
            .map_err(cellar_core::CryptoError::from)?;
        let crypto = cellar_crypto::connect(&backend, signer).await?;
        let kv = cellar_storage::RedisStore::connect(&settings.redis).await?;

        Ok(Self::builder(Arc::new(kv), crypto)
            .policy(SecretPolicy::from(&settings.app))
            .rate_limit(settings.rate_limit.clone())
            .version(settings.app.version.clone())
            .build())
    }

    pub async fn create_secret(
        &self,
        ctx: &OperationContext,
        request: NewSecret,
    ) -> Result<SecretMetadata> {
        lifecycle::create_secret(ctx, &self.policy, &self.store, self.crypto.as_ref(), request)
            .await
    }

    pub async fn access_secret(
        &self,
        ctx: &OperationContext,
        id: &SecretId,
    ) -> Result<Option<SecretContent>> {
        lifecycle::access_secret(ctx, &self.store, self.crypto.as_ref(), id).await
    }

    pub async fn get_secret_metadata(
        &self,
        ctx: &OperationContext,
        id: &SecretId,
    ) -> Result<Option<SecretMetadata>> {
        lifecycle::get_secret_metadata(ctx, &self.store, id).await
    }

    pub async fn delete_secret(&self, ctx: &OperationContext, id: &SecretId) -> Result<bool> {
        lifecycle::delete_secret(ctx, &self.store, id).await
    }

    pub async fn get_health(&self, ctx: &OperationContext) -> HealthReport {
        lifecycle::get_health(ctx, &self.store, self.crypto.as_ref(), &self.version).await
    }

    pub fn limits(&self) -> Limits {
        self.policy.limits()
    }

    /// Record a request for `identifier` in `tier`.
    ///
    /// Always allowed when rate limiting is disabled.
    pub async fn allow(
        &self,
        ctx: &OperationContext,
        identifier: &str,
        tier: Tier,
    ) -> Result<RateLimitResult> {
        self.limiter.allow(ctx, identifier, tier).await
    }

    pub fn rate_limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &SecretPolicy {
        &self.policy
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

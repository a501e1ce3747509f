//! Secret persistence over a [`KeyValueStore`].
//!
//! A secret is stored as one string key per field, all written in a single
//! atomic batch with the secret's remaining lifetime as TTL. Reads are
//! all-or-nothing: if any required field is missing or malformed the secret
//! is reported as absent.

use crate::keys::{SecretField, SecretKeys};
use crate::kv::KeyValueStore;
use cellar_core::{
    Clock, Health, OperationContext, Result, SecretId, SecretRecord, StorageError, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// TTL-bound secret persistence.
#[derive(Debug, Clone)]
pub struct SecretStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

/// Raw field values read back from the backend.
#[derive(Debug, Default)]
struct SecretFields {
    content_type: Option<String>,
    content: Option<String>,
    access: Option<String>,
    access_limit: Option<String>,
    expiration_epoch: Option<String>,
    filename: Option<String>,
}

impl SecretFields {
    fn from_values(values: Vec<Option<String>>) -> Self {
        let mut fields = Self::default();
        for (field, value) in SecretField::ALL.into_iter().zip(values) {
            let slot = match field {
                SecretField::ContentType => &mut fields.content_type,
                SecretField::Content => &mut fields.content,
                SecretField::Access => &mut fields.access,
                SecretField::AccessLimit => &mut fields.access_limit,
                SecretField::ExpirationEpoch => &mut fields.expiration_epoch,
                SecretField::Filename => &mut fields.filename,
            };
            *slot = value;
        }
        fields
    }

    /// Reconcile into a record; `None` unless every required field is usable.
    fn reconcile(self, id: &SecretId) -> Option<SecretRecord> {
        Some(SecretRecord {
            id: id.clone(),
            content_type: self.content_type?.parse().ok()?,
            cipher_text: self.content?,
            access_count: self.access?.parse().ok()?,
            access_limit: self.access_limit?.parse().ok()?,
            expiration_epoch: self.expiration_epoch?.parse().ok()?,
            filename: self.filename,
        })
    }
}

impl SecretStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(kv, Arc::new(SystemClock))
    }

    pub fn with_clock(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Underlying key-value backend.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Time source used for TTLs.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Persist every field of `record` with TTL equal to its remaining lifetime.
    #[tracing::instrument(skip(self, ctx, record), fields(redis_key = %record.id))]
    pub async fn write_secret(&self, ctx: &OperationContext, record: &SecretRecord) -> Result<()> {
        ctx.check()?;

        let remaining = record.remaining_seconds(self.clock.now());
        let ttl = u64::try_from(remaining)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .ok_or(StorageError::InvalidTtl { seconds: remaining })?;

        let keys = SecretKeys::new(&record.id);
        let mut entries = vec![
            (keys.key(SecretField::Access), "0".to_owned()),
            (
                keys.key(SecretField::AccessLimit),
                record.access_limit.to_string(),
            ),
            (
                keys.key(SecretField::ContentType),
                record.content_type.as_str().to_owned(),
            ),
            (keys.key(SecretField::Content), record.cipher_text.clone()),
            (
                keys.key(SecretField::ExpirationEpoch),
                record.expiration_epoch.to_string(),
            ),
        ];
        if let Some(filename) = &record.filename {
            entries.push((keys.key(SecretField::Filename), filename.clone()));
        }

        tracing::debug!(ttl_seconds = ttl.as_secs(), "Writing secret to datastore");
        self.kv.set_many_ex(&entries, ttl).await
    }

    /// Read a secret back. Missing or malformed fields yield `Ok(None)`.
    #[tracing::instrument(skip(self, ctx, id), fields(redis_key = %id))]
    pub async fn read_secret(
        &self,
        ctx: &OperationContext,
        id: &SecretId,
    ) -> Result<Option<SecretRecord>> {
        ctx.check()?;

        let keys = SecretKeys::new(id);
        let values = self.kv.get_many(&keys.all()).await?;
        let record = SecretFields::from_values(values).reconcile(id);
        if record.is_none() {
            tracing::debug!("Secret absent or incomplete");
        }
        Ok(record)
    }

    /// Atomically bump the access counter and return the new value.
    #[tracing::instrument(skip(self, ctx, id), fields(redis_key = %id))]
    pub async fn increase_access_count(&self, ctx: &OperationContext, id: &SecretId) -> Result<i64> {
        ctx.check()?;
        self.kv
            .incr(&SecretKeys::new(id).key(SecretField::Access))
            .await
    }

    /// Count one access to `record` and keep the counter's lifetime bound to it.
    ///
    /// `INCR` recreates the counter without a TTL when the secret expired
    /// after it was read, so the expiry is pinned to the secret's again. A
    /// counter that outlived its secret is removed.
    #[tracing::instrument(skip(self, ctx, record), fields(redis_key = %record.id))]
    pub async fn consume_access(&self, ctx: &OperationContext, record: &SecretRecord) -> Result<i64> {
        let count = self.increase_access_count(ctx, &record.id).await?;

        let key = SecretKeys::new(&record.id).key(SecretField::Access);
        let remaining = record.remaining_seconds(self.clock.now());
        match u64::try_from(remaining).ok().filter(|s| *s > 0) {
            Some(seconds) => {
                self.kv.expire(&key, Duration::from_secs(seconds)).await?;
            }
            None => {
                tracing::debug!("Secret expired during access, dropping counter");
                self.kv.del(std::slice::from_ref(&key)).await?;
            }
        }
        Ok(count)
    }

    /// Remove every key of a secret. `true` if anything existed.
    #[tracing::instrument(skip(self, ctx, id), fields(redis_key = %id))]
    pub async fn delete_secret(&self, ctx: &OperationContext, id: &SecretId) -> Result<bool> {
        ctx.check()?;
        let removed = self.kv.del(&SecretKeys::new(id).all()).await?;
        Ok(removed > 0)
    }

    /// Backend health. Unhealthy if the context finishes first.
    pub async fn health(&self, ctx: &OperationContext) -> Health {
        match ctx.run(self.kv.health()).await {
            Ok(health) => health,
            Err(_) => Health::unhealthy(self.kv.name()),
        }
    }
}

impl From<Arc<dyn KeyValueStore>> for SecretStore {
    fn from(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(kv)
    }
}

//! Secret lifecycle operations.
//!
//! A secret is created once, read until its access limit is consumed, and
//! then burned. There is no in-process locking: "at most N reads" relies on
//! the backend's atomic increment and all-or-nothing reads.

use crate::policy::SecretPolicy;
use cellar_core::{
    HealthReport, NewSecret, OperationContext, Result, SecretContent, SecretId, SecretMetadata,
    SecretRecord, UNKNOWN, format_expiration,
};
use cellar_crypto::CryptoProvider;
use cellar_storage::SecretStore;

/// Encrypt and persist a new secret, returning its metadata.
///
/// Nothing is written unless the request satisfies `policy`.
#[tracing::instrument(skip_all, fields(secret_id = tracing::field::Empty))]
pub async fn create_secret(
    ctx: &OperationContext,
    policy: &SecretPolicy,
    store: &SecretStore,
    crypto: &dyn CryptoProvider,
    request: NewSecret,
) -> Result<SecretMetadata> {
    ctx.check()?;

    let id = SecretId::generate();
    tracing::Span::current().record("secret_id", tracing::field::display(&id));

    tracing::info!("Encrypting new secret content");
    let cipher_text = crypto
        .encrypt(ctx, &request.content)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error encrypting new secret content"))?;

    let access_limit = request.access_limit.max(0);
    let record = SecretRecord {
        id,
        cipher_text,
        content_type: request.content_type,
        filename: request.filename.clone(),
        access_count: 0,
        access_limit,
        expiration_epoch: request.expiration_epoch,
    };

    let duration = record.remaining_seconds(store.clock().now());
    policy.validate(&request, access_limit, duration)?;

    tracing::info!(
        secret_access_limit = record.access_limit,
        secret_expiration = %format_expiration(record.expiration_epoch),
        "Writing new secret to datastore"
    );
    store
        .write_secret(ctx, &record)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error writing new secret to datastore"))?;

    Ok(record.metadata())
}

/// Read a secret's content, consuming one access.
///
/// When the access consumes the limit the secret is deleted before the
/// content is returned. A failed deletion is reported even though the access
/// was counted; the next access deletes it instead.
#[tracing::instrument(skip_all, fields(secret_id = %id))]
pub async fn access_secret(
    ctx: &OperationContext,
    store: &SecretStore,
    crypto: &dyn CryptoProvider,
    id: &SecretId,
) -> Result<Option<SecretContent>> {
    ctx.check()?;

    let Some(record) = store.read_secret(ctx, id).await? else {
        return Ok(None);
    };

    let access_count = store.consume_access(ctx, &record).await?;
    tracing::info!(
        secret_access_count = access_count,
        secret_access_limit = record.access_limit,
        secret_expiration = %format_expiration(record.expiration_epoch),
        "Accessed secret"
    );

    if record.limit_reached(access_count) {
        tracing::info!("Deleting secret with access limit reached");
        store
            .delete_secret(ctx, id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Error while deleting secret"))?;
    }

    let content = crypto.decrypt(ctx, &record.cipher_text).await?;
    Ok(Some(SecretContent {
        id: record.id,
        content,
        content_type: record.content_type,
        filename: record.filename,
    }))
}

/// Metadata of a live secret. Never counts as an access.
#[tracing::instrument(skip_all, fields(secret_id = %id))]
pub async fn get_secret_metadata(
    ctx: &OperationContext,
    store: &SecretStore,
    id: &SecretId,
) -> Result<Option<SecretMetadata>> {
    ctx.check()?;
    tracing::info!("Querying for secret metadata");
    Ok(store
        .read_secret(ctx, id)
        .await?
        .map(|record| record.metadata()))
}

/// Delete a secret. `Ok(false)` if it did not exist.
#[tracing::instrument(skip_all, fields(secret_id = %id))]
pub async fn delete_secret(
    ctx: &OperationContext,
    store: &SecretStore,
    id: &SecretId,
) -> Result<bool> {
    ctx.check()?;
    tracing::info!("Deleting secret if it exists");
    store.delete_secret(ctx, id).await
}

/// Aggregate datastore and encryption health.
pub async fn get_health(
    ctx: &OperationContext,
    store: &SecretStore,
    crypto: &dyn CryptoProvider,
    version: &str,
) -> HealthReport {
    let (datastore, encryption) = tokio::join!(store.health(ctx), crypto.health(ctx));
    HealthReport::assess(hostname(), version, datastore, encryption)
}

/// Host name from `HOSTNAME`, or `Unknown`.
pub fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

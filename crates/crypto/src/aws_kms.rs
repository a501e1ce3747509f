//! AWS Key Management Service provider.
//!
//! Credentials come from the default AWS chain (environment, shared
//! profile, instance or task role). KMS returns binary cipher blobs; they
//! are carried as standard base64 so they survive string storage.

use crate::config::{AwsKmsConfig, ProviderConfig};
use crate::provider::CryptoProvider;
use async_trait::async_trait;
use aws_sdk_kms::Client;
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cellar_core::{CryptoError, Health, HealthStatus, OperationContext, Result};

const NAME: &str = "AWS KMS";
/// KMS API version reported in health checks.
const API_VERSION: &str = "2014-11-01";

#[derive(Debug)]
pub struct AwsKmsProvider {
    client: Client,
    key_id: String,
}

impl AwsKmsProvider {
    pub async fn new(config: &AwsKmsConfig) -> std::result::Result<Self, CryptoError> {
        config.validate()?;

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        tracing::info!(
            provider = NAME,
            region = %config.region,
            "initialized AWS KMS provider"
        );

        Ok(Self {
            client: Client::new(&sdk_config),
            key_id: config.kms_key_name.clone(),
        })
    }
}

#[async_trait]
impl CryptoProvider for AwsKmsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self, ctx, plaintext), fields(key = %self.key_id))]
    async fn encrypt(&self, ctx: &OperationContext, plaintext: &[u8]) -> Result<String> {
        ctx.check()?;
        tracing::debug!("attempting to encrypt content");

        let request = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .plaintext(Blob::new(plaintext))
            .send();
        let output = ctx.run(request).await?.map_err(|e| {
            tracing::error!(error = %DisplayErrorContext(&e), "error encrypting content");
            CryptoError::EncryptionFailed(DisplayErrorContext(&e).to_string())
        })?;

        let blob = output.ciphertext_blob().ok_or_else(|| {
            CryptoError::UnexpectedResponse("KMS returned no ciphertext blob".into())
        })?;
        Ok(STANDARD.encode(blob.as_ref()))
    }

    #[tracing::instrument(skip(self, ctx, ciphertext), fields(key = %self.key_id))]
    async fn decrypt(&self, ctx: &OperationContext, ciphertext: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        tracing::debug!("attempting to decrypt content");

        let blob = STANDARD
            .decode(ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid ciphertext: {e}")))?;
        let request = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .ciphertext_blob(Blob::new(blob))
            .send();
        let output = ctx.run(request).await?.map_err(|e| {
            tracing::error!(error = %DisplayErrorContext(&e), "error decrypting content");
            CryptoError::DecryptionFailed(DisplayErrorContext(&e).to_string())
        })?;

        output
            .plaintext()
            .map(|p| p.as_ref().to_vec())
            .ok_or_else(|| CryptoError::UnexpectedResponse("KMS returned no plaintext".into()).into())
    }

    async fn health(&self, ctx: &OperationContext) -> Health {
        let request = self.client.describe_key().key_id(&self.key_id).send();
        let status = match ctx.run(request).await {
            Ok(Ok(_)) => HealthStatus::Healthy,
            Ok(Err(e)) => {
                tracing::warn!(error = %DisplayErrorContext(&e), "KMS describe key failed");
                HealthStatus::Unhealthy
            }
            Err(e) => {
                tracing::warn!(error = %e, "KMS health check abandoned");
                HealthStatus::Unhealthy
            }
        };
        Health::new(NAME, status, API_VERSION)
    }
}

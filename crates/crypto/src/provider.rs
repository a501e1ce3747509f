//! The crypto capability and backend selection.

use crate::auth::IamLoginSigner;
use crate::config::CryptoBackend;
use crate::vault::VaultTransitProvider;
use async_trait::async_trait;
use cellar_core::{Health, OperationContext, Result};
use std::fmt;
use std::sync::Arc;

/// Reversible encryption through an external engine.
///
/// Implementations check the context before any network call. Cipher text
/// is an opaque string; only the provider that produced it can reverse it.
#[async_trait]
pub trait CryptoProvider: Send + Sync + fmt::Debug {
    /// Display name used in health reports.
    fn name(&self) -> &'static str;

    async fn encrypt(&self, ctx: &OperationContext, plaintext: &[u8]) -> Result<String>;

    async fn decrypt(&self, ctx: &OperationContext, ciphertext: &str) -> Result<Vec<u8>>;

    /// Reachability and engine version. Never fails.
    async fn health(&self, ctx: &OperationContext) -> Health;
}

/// Build the provider for `backend`.
///
/// `signer` supplies the cloud identity proof for AWS-IAM and GCP-IAM
/// Vault logins and is ignored otherwise.
pub async fn connect(
    backend: &CryptoBackend,
    signer: Option<Arc<dyn IamLoginSigner>>,
) -> Result<Arc<dyn CryptoProvider>> {
    tracing::info!(
        provider = backend.provider_name(),
        "Connecting to cryptography engine"
    );
    match backend {
        CryptoBackend::Vault(config) => {
            let provider = VaultTransitProvider::new(config, signer)?;
            Ok(Arc::new(provider))
        }
        #[cfg(feature = "aws-kms")]
        CryptoBackend::AwsKms(config) => {
            let provider = crate::aws_kms::AwsKmsProvider::new(config).await?;
            Ok(Arc::new(provider))
        }
        #[cfg(not(feature = "aws-kms"))]
        CryptoBackend::AwsKms(_) => Err(cellar_core::CryptoError::Config(
            cellar_core::ConfigError::ValidationFailed(
                "AWS KMS support is not compiled in; enable the `aws-kms` feature".into(),
            ),
        )
        .into()),
    }
}

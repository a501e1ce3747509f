//! # Cellar Crypto
//!
//! Encryption is delegated to an external engine; this crate only speaks to it.
//!
//! - [`CryptoProvider`]: the capability the secret lifecycle depends on
//! - [`VaultTransitProvider`]: HashiCorp Vault transit engine over HTTP
//! - `AwsKmsProvider` (feature `aws-kms`): AWS Key Management Service
//! - [`CryptographyConfig`]: settings with the "exactly one engine" rule
//!
//! The backend is chosen once with [`connect`]; callers never branch on it.

pub mod auth;
#[cfg(feature = "aws-kms")]
pub mod aws_kms;
pub mod config;
pub mod provider;
pub mod vault;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use auth::{IamLoginSigner, VaultAuth, VaultAuthMethod};
#[cfg(feature = "aws-kms")]
pub use aws_kms::AwsKmsProvider;
pub use config::{
    AppRoleConfig, AwsKmsConfig, CryptoBackend, CryptographyConfig, IamRoleConfig,
    KubernetesAuthConfig, ProviderConfig, VaultAuthConfig, VaultConfig,
};
pub use provider::{CryptoProvider, connect};
pub use vault::VaultTransitProvider;

//! Crypto provider configuration.
//!
//! Exactly one engine may be enabled. Vault additionally needs exactly one
//! auth method; the raw, serde-friendly [`VaultAuthConfig`] is resolved into
//! the [`VaultAuth`] sum type by a single validation pass.

use crate::auth::{VaultAuth, VaultAuthMethod};
use cellar_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the Kubernetes service-account token.
pub const DEFAULT_KUBERNETES_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Common behaviour of provider configurations.
pub trait ProviderConfig {
    /// Provider display name
    fn provider_name(&self) -> &'static str;

    /// Check the configuration before the provider is built.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// All crypto engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptographyConfig {
    pub vault: VaultConfig,
    pub aws: AwsKmsConfig,
}

/// The one engine selected for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoBackend {
    Vault(VaultConfig),
    AwsKms(AwsKmsConfig),
}

impl CryptoBackend {
    /// Display name of the selected engine
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Vault(config) => config.provider_name(),
            Self::AwsKms(config) => config.provider_name(),
        }
    }
}

impl CryptographyConfig {
    /// Select and validate the single enabled engine.
    pub fn backend(&self) -> Result<CryptoBackend, ConfigError> {
        let backend = match (self.vault.enabled, self.aws.enabled) {
            (true, true) => {
                return Err(ConfigError::ValidationFailed(
                    "cannot enable more than one cryptography engine".into(),
                ));
            }
            (false, false) => {
                return Err(ConfigError::ValidationFailed(
                    "at least one cryptography engine is required".into(),
                ));
            }
            (true, false) => CryptoBackend::Vault(self.vault.clone()),
            (false, true) => CryptoBackend::AwsKms(self.aws.clone()),
        };

        match &backend {
            CryptoBackend::Vault(vault) => vault.validate()?,
            CryptoBackend::AwsKms(aws) => aws.validate()?,
        }
        Ok(backend)
    }
}

/// Vault transit engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub enabled: bool,

    /// Server address, e.g. `https://vault.example.com:8200`
    pub address: String,

    /// Name of the transit key
    pub encryption_token_name: String,

    pub auth: VaultAuthConfig,

    /// HTTP request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "http://localhost:8200".into(),
            encryption_token_name: String::new(),
            auth: VaultAuthConfig::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProviderConfig for VaultConfig {
    fn provider_name(&self) -> &'static str {
        "Vault"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::missing("cryptography.vault.address"));
        }
        if !self.address.starts_with("http://") && !self.address.starts_with("https://") {
            return Err(ConfigError::invalid(
                "cryptography.vault.address",
                "must start with http:// or https://",
            ));
        }
        if self.encryption_token_name.is_empty() {
            return Err(ConfigError::missing(
                "cryptography.vault.encryption_token_name",
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid(
                "cryptography.vault.timeout",
                "must be greater than zero",
            ));
        }
        self.auth.resolve().map(|_| ())
    }
}

/// Raw Vault auth settings. At most one method block may be filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultAuthConfig {
    pub mount_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approle: Option<AppRoleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awsiam: Option<IamRoleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcpiam: Option<IamRoleConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesAuthConfig>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppRoleConfig {
    pub role_id: String,
    pub secret_id: String,
}

impl fmt::Debug for AppRoleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRoleConfig")
            .field("role_id", &self.role_id)
            .field("secret_id", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IamRoleConfig {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesAuthConfig {
    pub role: String,
    pub jwt_path: PathBuf,
}

impl Default for KubernetesAuthConfig {
    fn default() -> Self {
        Self {
            role: String::new(),
            jwt_path: PathBuf::from(DEFAULT_KUBERNETES_JWT_PATH),
        }
    }
}

fn require(value: &str, field: &str) -> Result<String, ConfigError> {
    if value.is_empty() {
        Err(ConfigError::missing(field))
    } else {
        Ok(value.to_owned())
    }
}

impl VaultAuthConfig {
    /// Resolve to exactly one auth method.
    pub fn resolve(&self) -> Result<VaultAuth, ConfigError> {
        let mount_path = require(&self.mount_path, "cryptography.vault.auth.mount_path")?;

        let approle = self
            .approle
            .as_ref()
            .filter(|a| !(a.role_id.is_empty() && a.secret_id.is_empty()));
        let awsiam = self.awsiam.as_ref().filter(|a| !a.role.is_empty());
        let gcpiam = self.gcpiam.as_ref().filter(|g| !g.role.is_empty());
        let kubernetes = self.kubernetes.as_ref().filter(|k| !k.role.is_empty());

        let configured = usize::from(approle.is_some())
            + usize::from(awsiam.is_some())
            + usize::from(gcpiam.is_some())
            + usize::from(kubernetes.is_some());
        if configured > 1 {
            return Err(ConfigError::ValidationFailed(
                "only one vault auth method configuration is allowed but multiple were detected"
                    .into(),
            ));
        }

        let method = if let Some(a) = approle {
            VaultAuthMethod::AppRole {
                role_id: require(&a.role_id, "cryptography.vault.auth.approle.role_id")?,
                secret_id: require(&a.secret_id, "cryptography.vault.auth.approle.secret_id")?,
            }
        } else if let Some(a) = awsiam {
            VaultAuthMethod::AwsIam {
                role: a.role.clone(),
            }
        } else if let Some(g) = gcpiam {
            VaultAuthMethod::GcpIam {
                role: g.role.clone(),
            }
        } else if let Some(k) = kubernetes {
            if k.jwt_path.as_os_str().is_empty() {
                return Err(ConfigError::missing(
                    "cryptography.vault.auth.kubernetes.jwt_path",
                ));
            }
            VaultAuthMethod::Kubernetes {
                role: k.role.clone(),
                jwt_path: k.jwt_path.clone(),
            }
        } else {
            return Err(ConfigError::ValidationFailed(
                "no Vault auth method configurations were detected".into(),
            ));
        };

        Ok(VaultAuth { mount_path, method })
    }
}

/// AWS KMS settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsKmsConfig {
    pub enabled: bool,
    pub region: String,
    /// Key id, ARN or alias
    pub kms_key_name: String,
}

impl ProviderConfig for AwsKmsConfig {
    fn provider_name(&self) -> &'static str {
        "AWS KMS"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require(&self.region, "cryptography.aws.region")?;
        require(&self.kms_key_name, "cryptography.aws.kms_key_name")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn approle() -> VaultAuthConfig {
        VaultAuthConfig {
            mount_path: "approle".into(),
            approle: Some(AppRoleConfig {
                role_id: "role".into(),
                secret_id: "secret".into(),
            }),
            ..VaultAuthConfig::default()
        }
    }

    fn vault() -> VaultConfig {
        VaultConfig {
            enabled: true,
            encryption_token_name: "cellar".into(),
            auth: approle(),
            ..VaultConfig::default()
        }
    }

    #[test]
    fn resolves_single_approle() {
        let auth = approle().resolve().unwrap();
        assert_eq!(auth.mount_path, "approle");
        assert_eq!(
            auth.method,
            VaultAuthMethod::AppRole {
                role_id: "role".into(),
                secret_id: "secret".into(),
            }
        );
    }

    #[test]
    fn rejects_multiple_methods() {
        let mut auth = approle();
        auth.kubernetes = Some(KubernetesAuthConfig {
            role: "cellar".into(),
            ..KubernetesAuthConfig::default()
        });
        let err = auth.resolve().unwrap_err();
        assert!(err.to_string().contains("multiple were detected"));
    }

    #[test]
    fn rejects_no_method() {
        let auth = VaultAuthConfig {
            mount_path: "approle".into(),
            // An all-empty block counts as not configured.
            approle: Some(AppRoleConfig::default()),
            ..VaultAuthConfig::default()
        };
        let err = auth.resolve().unwrap_err();
        assert!(err.to_string().contains("no Vault auth method"));
    }

    #[test]
    fn rejects_half_filled_approle() {
        let mut auth = approle();
        auth.approle = Some(AppRoleConfig {
            role_id: "role".into(),
            secret_id: String::new(),
        });
        assert_eq!(
            auth.resolve().unwrap_err(),
            ConfigError::missing("cryptography.vault.auth.approle.secret_id")
        );
    }

    #[test]
    fn requires_mount_path() {
        let mut auth = approle();
        auth.mount_path.clear();
        assert_eq!(
            auth.resolve().unwrap_err(),
            ConfigError::missing("cryptography.vault.auth.mount_path")
        );
    }

    #[test]
    fn kubernetes_defaults_jwt_path() {
        let auth = VaultAuthConfig {
            mount_path: "kubernetes".into(),
            kubernetes: Some(KubernetesAuthConfig {
                role: "cellar".into(),
                ..KubernetesAuthConfig::default()
            }),
            ..VaultAuthConfig::default()
        };
        assert_eq!(
            auth.resolve().unwrap().method,
            VaultAuthMethod::Kubernetes {
                role: "cellar".into(),
                jwt_path: PathBuf::from(DEFAULT_KUBERNETES_JWT_PATH),
            }
        );
    }

    #[test]
    fn exactly_one_engine() {
        let both = CryptographyConfig {
            vault: vault(),
            aws: AwsKmsConfig {
                enabled: true,
                region: "us-east-1".into(),
                kms_key_name: "alias/cellar".into(),
            },
        };
        assert!(
            both.backend()
                .unwrap_err()
                .to_string()
                .contains("cannot enable more than one")
        );

        let none = CryptographyConfig::default();
        assert!(
            none.backend()
                .unwrap_err()
                .to_string()
                .contains("at least one cryptography engine is required")
        );

        let only_vault = CryptographyConfig {
            vault: vault(),
            ..CryptographyConfig::default()
        };
        let backend = only_vault.backend().unwrap();
        assert!(matches!(backend, CryptoBackend::Vault(_)));
        assert_eq!(backend.provider_name(), "Vault");

        let only_aws = CryptographyConfig {
            aws: AwsKmsConfig {
                enabled: true,
                region: "us-east-1".into(),
                kms_key_name: "alias/cellar".into(),
            },
            ..CryptographyConfig::default()
        };
        assert_eq!(only_aws.backend().unwrap().provider_name(), "AWS KMS");
    }

    #[test]
    fn aws_requires_region_and_key() {
        let aws = AwsKmsConfig {
            enabled: true,
            region: "eu-west-1".into(),
            kms_key_name: String::new(),
        };
        assert_eq!(
            aws.validate().unwrap_err(),
            ConfigError::missing("cryptography.aws.kms_key_name")
        );
    }

    #[test]
    fn vault_requires_transit_key() {
        let mut config = vault();
        config.encryption_token_name.clear();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::missing("cryptography.vault.encryption_token_name")
        );
    }

    #[test]
    fn app_role_debug_hides_secret() {
        let rendered = format!("{:?}", approle());
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("[REDACTED]"));
    }
}

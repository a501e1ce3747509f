//! Vault authentication methods.

use async_trait::async_trait;
use cellar_core::CryptoError;
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A resolved Vault login: where to log in and with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAuth {
    /// Auth engine mount, e.g. `approle` for `/v1/auth/approle/login`
    pub mount_path: String,
    pub method: VaultAuthMethod,
}

/// Exactly one way of obtaining a Vault token.
#[derive(Clone, PartialEq, Eq)]
pub enum VaultAuthMethod {
    AppRole { role_id: String, secret_id: String },
    AwsIam { role: String },
    GcpIam { role: String },
    Kubernetes { role: String, jwt_path: PathBuf },
}

impl fmt::Debug for VaultAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .field("secret_id", &"[REDACTED]")
                .finish(),
            Self::AwsIam { role } => f.debug_struct("AwsIam").field("role", role).finish(),
            Self::GcpIam { role } => f.debug_struct("GcpIam").field("role", role).finish(),
            Self::Kubernetes { role, jwt_path } => f
                .debug_struct("Kubernetes")
                .field("role", role)
                .field("jwt_path", jwt_path)
                .finish(),
        }
    }
}

impl VaultAuthMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AppRole { .. } => "approle",
            Self::AwsIam { .. } => "aws-iam",
            Self::GcpIam { .. } => "gcp-iam",
            Self::Kubernetes { .. } => "kubernetes",
        }
    }

    /// Whether the login needs a cloud identity proof from an [`IamLoginSigner`].
    pub fn needs_signer(&self) -> bool {
        matches!(self, Self::AwsIam { .. } | Self::GcpIam { .. })
    }
}

/// Produces the signed identity payload for cloud IAM logins.
///
/// For AWS this is the signed `sts:GetCallerIdentity` request fields
/// (`iam_http_request_method`, `iam_request_url`, ...); for GCP a signed JWT
/// under `jwt`. The `role` field is added by the caller.
#[async_trait]
pub trait IamLoginSigner: Send + Sync + fmt::Debug {
    async fn login_parameters(
        &self,
        role: &str,
        mount_path: &str,
    ) -> Result<Map<String, Value>, CryptoError>;
}

impl VaultAuth {
    /// JSON body for `POST /v1/auth/{mount_path}/login`.
    pub(crate) async fn login_body(
        &self,
        signer: Option<&Arc<dyn IamLoginSigner>>,
    ) -> Result<Value, CryptoError> {
        match &self.method {
            VaultAuthMethod::AppRole { role_id, secret_id } => Ok(json!({
                "role_id": role_id,
                "secret_id": secret_id,
            })),
            VaultAuthMethod::Kubernetes { role, jwt_path } => {
                let jwt = tokio::fs::read_to_string(jwt_path).await.map_err(|e| {
                    CryptoError::Authentication(format!(
                        "unable to read kubernetes service account jwt from {}: {e}",
                        jwt_path.display()
                    ))
                })?;
                let jwt = jwt.trim();
                if jwt.is_empty() {
                    return Err(CryptoError::Authentication(
                        "kubernetes service account jwt was found to be empty".into(),
                    ));
                }
                Ok(json!({ "role": role, "jwt": jwt }))
            }
            VaultAuthMethod::AwsIam { role } | VaultAuthMethod::GcpIam { role } => {
                let signer = signer.ok_or_else(|| {
                    CryptoError::Authentication(format!(
                        "{} login requires an identity signer",
                        self.method.name()
                    ))
                })?;
                let mut body = signer.login_parameters(role, &self.mount_path).await?;
                body.insert("role".into(), Value::String(role.clone()));
                Ok(Value::Object(body))
            }
        }
    }
}

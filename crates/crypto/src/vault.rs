//! HashiCorp Vault transit engine over its HTTP API.

use crate::auth::{IamLoginSigner, VaultAuth};
use crate::config::{ProviderConfig, VaultConfig};
use crate::provider::CryptoProvider;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cellar_core::{
    ConfigError, CryptoError, Health, HealthStatus, OperationContext, Result, UNKNOWN,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

const NAME: &str = "Vault";
const TOKEN_HEADER: &str = "X-Vault-Token";
/// Seconds requested when renewing the current token.
const RENEW_INCREMENT_SECONDS: u64 = 60;

/// Transit encryption backed by a Vault server.
///
/// A token is obtained lazily. Before each operation the current token is
/// renewed; if that fails a fresh login is performed with the configured
/// auth method.
pub struct VaultTransitProvider {
    client: reqwest::Client,
    address: String,
    key_name: String,
    auth: VaultAuth,
    signer: Option<Arc<dyn IamLoginSigner>>,
    token: RwLock<Option<Zeroizing<String>>>,
}

impl fmt::Debug for VaultTransitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultTransitProvider")
            .field("address", &self.address)
            .field("key_name", &self.key_name)
            .field("auth", &self.auth.method.name())
            .field("has_token", &self.token.read().is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    auth: AuthBlock,
}

#[derive(Deserialize)]
struct AuthBlock {
    client_token: String,
}

#[derive(Deserialize)]
struct SysHealth {
    #[serde(default)]
    sealed: bool,
    #[serde(default)]
    version: Option<String>,
}

impl VaultTransitProvider {
    /// Validate `config` and build the HTTP client. No request is sent.
    pub fn new(
        config: &VaultConfig,
        signer: Option<Arc<dyn IamLoginSigner>>,
    ) -> std::result::Result<Self, CryptoError> {
        config.validate()?;
        let auth = config.auth.resolve()?;
        if auth.method.needs_signer() && signer.is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "vault {} auth requires an identity signer",
                auth.method.name()
            ))
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CryptoError::Transport(e.to_string()))?;

        tracing::debug!(
            address = %config.address,
            auth = auth.method.name(),
            "vault transit provider configured"
        );

        Ok(Self {
            client,
            address: config.address.trim_end_matches('/').to_owned(),
            key_name: config.encryption_token_name.clone(),
            auth,
            signer,
            token: RwLock::new(None),
        })
    }

    /// Start from an existing token instead of logging in first.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write() = Some(Zeroizing::new(token.into()));
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.address)
    }

    fn current_token(&self) -> Option<Zeroizing<String>> {
        self.token.read().clone()
    }

    /// Renew the current token or log in again. Returns a usable token.
    async fn authenticate(&self) -> std::result::Result<Zeroizing<String>, CryptoError> {
        if let Some(token) = self.current_token() {
            tracing::debug!("attempting to renew existing vault token");
            match self.renew(&token).await {
                Ok(renewed) => {
                    tracing::debug!("vault token renewal successful");
                    *self.token.write() = Some(renewed.clone());
                    return Ok(renewed);
                }
                Err(e) => tracing::debug!(error = %e, "unable to renew vault token"),
            }
        }

        tracing::debug!(mount = %self.auth.mount_path, "attempting vault login");
        let token = self.login().await.inspect_err(|e| {
            tracing::error!(error = %e, "unable to login to vault");
        })?;
        tracing::debug!("vault login successful");
        *self.token.write() = Some(token.clone());
        Ok(token)
    }

    async fn renew(&self, token: &str) -> std::result::Result<Zeroizing<String>, CryptoError> {
        let response = self
            .client
            .post(self.url("auth/token/renew-self"))
            .header(TOKEN_HEADER, token)
            .json(&json!({ "increment": RENEW_INCREMENT_SECONDS }))
            .send()
            .await
            .map_err(|e| CryptoError::Transport(e.to_string()))?;
        Self::read_token(response).await
    }

    async fn login(&self) -> std::result::Result<Zeroizing<String>, CryptoError> {
        let body = self.auth.login_body(self.signer.as_ref()).await?;
        let response = self
            .client
            .post(self.url(&format!("auth/{}/login", self.auth.mount_path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| CryptoError::Transport(e.to_string()))?;
        Self::read_token(response).await
    }

    async fn read_token(
        response: reqwest::Response,
    ) -> std::result::Result<Zeroizing<String>, CryptoError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CryptoError::Authentication(format!(
                "vault returned {status}"
            )));
        }
        let parsed: AuthResponse = response
            .json()
            .await
            .map_err(|e| CryptoError::UnexpectedResponse(format!("invalid auth response: {e}")))?;
        Ok(Zeroizing::new(parsed.auth.client_token))
    }

    /// POST to a transit path and pull one string out of `data`.
    async fn transit(
        &self,
        operation: &str,
        body: Value,
        field: &str,
    ) -> std::result::Result<Zeroizing<String>, CryptoError> {
        let token = self.authenticate().await?;
        let failed = |msg: String| match operation {
            "encrypt" => CryptoError::EncryptionFailed(msg),
            _ => CryptoError::DecryptionFailed(msg),
        };

        let response = self
            .client
            .post(self.url(&format!("transit/{operation}/{}", self.key_name)))
            .header(TOKEN_HEADER, token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| CryptoError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(failed(format!("vault returned {status}: {detail}")));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| CryptoError::UnexpectedResponse(e.to_string()))?;
        parsed
            .get("data")
            .and_then(|data| data.get(field))
            .and_then(Value::as_str)
            .map(|value| Zeroizing::new(value.to_owned()))
            .ok_or_else(|| {
                CryptoError::UnexpectedResponse(format!(
                    "unexpected response while {operation}ing secret"
                ))
            })
    }

    async fn sys_health(&self) -> std::result::Result<Health, CryptoError> {
        self.authenticate().await?;
        let response = self
            .client
            .get(self.url("sys/health"))
            .query(&[
                ("standbyok", "true"),
                ("sealedcode", "200"),
                ("uninitcode", "200"),
            ])
            .send()
            .await
            .map_err(|e| CryptoError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CryptoError::UnexpectedResponse(format!(
                "vault health returned {}",
                response.status()
            )));
        }
        let health: SysHealth = response
            .json()
            .await
            .map_err(|e| CryptoError::UnexpectedResponse(e.to_string()))?;

        let status = if health.sealed {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let version = health
            .version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_owned());
        Ok(Health::new(NAME, status, version))
    }
}

#[async_trait]
impl CryptoProvider for VaultTransitProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self, ctx, plaintext), fields(key = %self.key_name))]
    async fn encrypt(&self, ctx: &OperationContext, plaintext: &[u8]) -> Result<String> {
        ctx.check()?;
        let encoded = Zeroizing::new(STANDARD.encode(plaintext));
        let body = json!({ "plaintext": encoded.as_str() });

        tracing::debug!("attempting to encrypt content with vault");
        let ciphertext = ctx
            .run(self.transit("encrypt", body, "ciphertext"))
            .await?
            .inspect_err(|e| tracing::error!(error = %e, "error encrypting content with vault"))?;
        Ok(ciphertext.as_str().to_owned())
    }

    #[tracing::instrument(skip(self, ctx, ciphertext), fields(key = %self.key_name))]
    async fn decrypt(&self, ctx: &OperationContext, ciphertext: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        let body = json!({ "ciphertext": ciphertext });

        tracing::debug!("attempting to decrypt content with vault");
        let encoded = ctx
            .run(self.transit("decrypt", body, "plaintext"))
            .await?
            .inspect_err(|e| tracing::error!(error = %e, "error decrypting content with vault"))?;
        let plaintext = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64 plaintext: {e}")))?;
        Ok(plaintext)
    }

    async fn health(&self, ctx: &OperationContext) -> Health {
        match ctx.run(self.sys_health()).await {
            Ok(Ok(health)) => health,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "vault health check failed");
                Health::unhealthy(NAME)
            }
            Err(e) => {
                tracing::warn!(error = %e, "vault health check abandoned");
                Health::unhealthy(NAME)
            }
        }
    }
}

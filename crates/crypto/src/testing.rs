//! Test doubles for crypto consumers.

use crate::provider::CryptoProvider;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cellar_core::{CryptoError, Health, HealthStatus, OperationContext, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

const PREFIX: &str = "cellar:v1:";

/// Reversible, non-secret "encryption" for tests.
///
/// Cipher text is `cellar:v1:` followed by base64 of the plaintext, so
/// tests can assert that stored content is not the plaintext while still
/// round-tripping it.
#[derive(Debug)]
pub struct InMemoryCrypto {
    fail_on_encrypt: AtomicBool,
    fail_on_decrypt: AtomicBool,
    encrypt_count: AtomicU32,
    decrypt_count: AtomicU32,
    health: Mutex<HealthStatus>,
}

impl InMemoryCrypto {
    pub fn new() -> Self {
        Self {
            fail_on_encrypt: AtomicBool::new(false),
            fail_on_decrypt: AtomicBool::new(false),
            encrypt_count: AtomicU32::new(0),
            decrypt_count: AtomicU32::new(0),
            health: Mutex::new(HealthStatus::Healthy),
        }
    }

    /// Make the next encrypt call fail
    pub fn fail_next_encrypt(&self) {
        self.fail_on_encrypt.store(true, Ordering::SeqCst);
    }

    /// Make the next decrypt call fail
    pub fn fail_next_decrypt(&self) {
        self.fail_on_decrypt.store(true, Ordering::SeqCst);
    }

    pub fn set_health(&self, status: HealthStatus) {
        *self.health.lock() = status;
    }

    pub fn encrypt_count(&self) -> u32 {
        self.encrypt_count.load(Ordering::SeqCst)
    }

    pub fn decrypt_count(&self) -> u32 {
        self.decrypt_count.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryCrypto {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CryptoProvider for InMemoryCrypto {
    fn name(&self) -> &'static str {
        "InMemory"
    }

    async fn encrypt(&self, ctx: &OperationContext, plaintext: &[u8]) -> Result<String> {
        ctx.check()?;
        self.encrypt_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_encrypt.swap(false, Ordering::SeqCst) {
            return Err(CryptoError::EncryptionFailed("injected failure".into()).into());
        }
        Ok(format!("{PREFIX}{}", STANDARD.encode(plaintext)))
    }

    async fn decrypt(&self, ctx: &OperationContext, ciphertext: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        self.decrypt_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_decrypt.swap(false, Ordering::SeqCst) {
            return Err(CryptoError::DecryptionFailed("injected failure".into()).into());
        }
        let encoded = ciphertext.strip_prefix(PREFIX).ok_or_else(|| {
            CryptoError::DecryptionFailed("cipher text was not produced by this provider".into())
        })?;
        STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()).into())
    }

    async fn health(&self, _ctx: &OperationContext) -> Health {
        Health::new(self.name(), *self.health.lock(), env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_and_hides_plaintext() {
        let crypto = InMemoryCrypto::new();
        let ctx = OperationContext::new();

        let cipher = crypto.encrypt(&ctx, b"hunter2").await.unwrap();
        assert!(!cipher.contains("hunter2"));
        assert_eq!(crypto.decrypt(&ctx, &cipher).await.unwrap(), b"hunter2");
        assert_eq!(crypto.encrypt_count(), 1);
        assert_eq!(crypto.decrypt_count(), 1);
    }

    #[tokio::test]
    async fn injected_failure_is_one_shot() {
        let crypto = InMemoryCrypto::new();
        let ctx = OperationContext::new();

        crypto.fail_next_encrypt();
        assert!(crypto.encrypt(&ctx, b"x").await.is_err());
        assert!(crypto.encrypt(&ctx, b"x").await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let crypto = InMemoryCrypto::new();
        let ctx = OperationContext::new();
        ctx.cancel();

        let err = crypto.encrypt(&ctx, b"x").await.unwrap_err();
        assert!(err.is_context_error());
        assert_eq!(crypto.encrypt_count(), 0);
    }
}

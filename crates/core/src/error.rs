//! Error types for Cellar operations
//!
//! This module defines a three-tier error hierarchy:
//! - [`CellarError`]: Top-level error returned by every engine operation
//! - [`ValidationError`]: Policy violations detected before anything is persisted
//! - [`ContextError`]: Cancellation or deadline expiry observed at an operation boundary
//! - [`StorageError`]: Key-value backend failures
//! - [`CryptoError`]: Encryption backend failures
//!
//! [`ConfigError`] is separate: it is raised while building components from
//! settings, before any operation runs.
//!
//! "Not found" is never an error: lookups return `Ok(None)` / `Ok(false)`.
//!
//! The transport layer maps errors through [`CellarError::kind`] and
//! [`ErrorKind::class`] rather than matching on messages.

use thiserror::Error;

/// Top-level Cellar error
#[derive(Debug, Error)]
pub enum CellarError {
    /// Request violates the secret policy; nothing was written
    #[error("Validation error: {source}")]
    Validation {
        /// Underlying validation error
        #[source]
        source: ValidationError,
    },

    /// Operation observed cancellation or deadline expiry
    #[error("{source}")]
    Context {
        /// Underlying context error
        #[source]
        source: ContextError,
    },

    /// Caller exceeded its request quota
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Seconds until the caller may retry
        retry_after_seconds: u64,
    },

    /// Key-value backend failure
    #[error("Storage error: {source}")]
    Storage {
        /// Underlying storage error
        #[source]
        source: StorageError,
    },

    /// Encryption backend failure
    #[error("Cryptographic error: {source}")]
    Crypto {
        /// Underlying crypto error
        #[source]
        source: CryptoError,
    },
}

/// Policy violations raised by secret creation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Expiration is closer than the minimum lifetime
    #[error("expiration must be at least {min_seconds} seconds in the future")]
    ExpirationTooSoon {
        /// Minimum lifetime in seconds
        min_seconds: i64,
        /// Remaining lifetime that was requested
        actual_seconds: i64,
    },

    /// Expiration is further away than the configured maximum
    #[error("expiration must be at most {max_seconds} seconds in the future, got {actual_seconds}")]
    ExpirationTooLate {
        /// Configured maximum lifetime in seconds
        max_seconds: i64,
        /// Remaining lifetime that was requested
        actual_seconds: i64,
    },

    /// Access limit exceeds the configured maximum
    #[error("access limit must not exceed {max}, got {actual}")]
    AccessLimitTooHigh {
        /// Configured maximum
        max: i64,
        /// Requested limit
        actual: i64,
    },

    /// File content is larger than allowed
    #[error("content of {actual_bytes} bytes exceeds the maximum of {max_bytes} bytes")]
    ContentTooLarge {
        /// Configured maximum in bytes
        max_bytes: u64,
        /// Submitted size in bytes
        actual_bytes: u64,
    },

    /// Content type string is neither `text` nor `file`
    #[error("unknown content type '{0}'")]
    UnknownContentType(String),
}

/// Cancellation and deadline errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The operation's cancellation token fired
    #[error("operation cancelled due to context cancellation")]
    Cancelled,

    /// The operation's deadline passed
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Key-value backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not reach the backend
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A command was rejected or failed in flight
    #[error("{operation} failed: {message}")]
    Command {
        /// Command or operation name
        operation: &'static str,
        /// Backend message
        message: String,
    },

    /// A write was attempted with a non-positive lifetime
    #[error("Refusing to write with non-positive TTL of {seconds} seconds")]
    InvalidTtl {
        /// Requested TTL
        seconds: i64,
    },
}

/// Encryption backend errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Backend refused or failed to encrypt
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Backend refused or failed to decrypt
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Could not obtain or renew backend credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Response was missing an expected field
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or protocol failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider could not be built from its configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors raised while validating settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Field has an unusable value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field path
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Required field is empty or absent
    #[error("Missing required field '{field}'")]
    MissingRequired {
        /// Dotted field path
        field: String,
    },

    /// Cross-field validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl ConfigError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Policy violation
    Validation,
    /// Cancellation or deadline
    Context,
    /// Quota exceeded
    RateLimit,
    /// Storage or crypto backend failure
    Backend,
}

/// How a boundary should report an [`ErrorKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller sent something the policy rejects (HTTP 400 / 413)
    ClientError,
    /// Request ran out of time or was abandoned (HTTP 408)
    Timeout,
    /// Caller must slow down (HTTP 429 with Retry-After)
    Throttled,
    /// Server-side failure (HTTP 500)
    Failure,
}

impl ErrorKind {
    /// Map the kind onto a boundary class
    pub fn class(self) -> ErrorClass {
        match self {
            Self::Validation => ErrorClass::ClientError,
            Self::Context => ErrorClass::Timeout,
            Self::RateLimit => ErrorClass::Throttled,
            Self::Backend => ErrorClass::Failure,
        }
    }
}

impl CellarError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Context { .. } => ErrorKind::Context,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Storage { .. } | Self::Crypto { .. } => ErrorKind::Backend,
        }
    }

    /// True when the error came from cancellation or deadline expiry
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Context { .. })
    }

    /// True when the error is a policy violation
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Seconds the caller should wait, for rate-limit errors
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        }
    }

    /// Build a storage command error
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        StorageError::Command {
            operation,
            message: message.into(),
        }
        .into()
    }
}

/// Result type alias for Cellar operations
pub type Result<T> = std::result::Result<T, CellarError>;

impl From<ValidationError> for CellarError {
    fn from(source: ValidationError) -> Self {
        Self::Validation { source }
    }
}

impl From<ContextError> for CellarError {
    fn from(source: ContextError) -> Self {
        Self::Context { source }
    }
}

impl From<StorageError> for CellarError {
    fn from(source: StorageError) -> Self {
        Self::Storage { source }
    }
}

impl From<CryptoError> for CellarError {
    fn from(source: CryptoError) -> Self {
        Self::Crypto { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::error::Error;

    #[test]
    fn test_context_error_message() {
        let err: CellarError = ContextError::Cancelled.into();
        assert_eq!(
            err.to_string(),
            "operation cancelled due to context cancellation"
        );
        assert!(err.is_context_error());
    }

    #[test]
    fn test_validation_error_too_soon() {
        let err = ValidationError::ExpirationTooSoon {
            min_seconds: 600,
            actual_seconds: 30,
        };
        assert_eq!(
            err.to_string(),
            "expiration must be at least 600 seconds in the future"
        );
    }

    #[test]
    fn test_cellar_error_from_validation() {
        let err: CellarError = ValidationError::AccessLimitTooHigh {
            max: 100,
            actual: 101,
        }
        .into();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("must not exceed 100"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_storage_helper() {
        let err = CellarError::storage("INCR", "connection reset");
        assert!(matches!(
            err,
            CellarError::Storage {
                source: StorageError::Command {
                    operation: "INCR",
                    ..
                }
            }
        ));
        assert_eq!(err.to_string(), "Storage error: INCR failed: connection reset");
    }

    #[test]
    fn test_kind_classes() {
        let cases: Vec<(CellarError, ErrorClass)> = vec![
            (
                ValidationError::UnknownContentType("x".into()).into(),
                ErrorClass::ClientError,
            ),
            (ContextError::DeadlineExceeded.into(), ErrorClass::Timeout),
            (
                CellarError::RateLimited {
                    retry_after_seconds: 60,
                },
                ErrorClass::Throttled,
            ),
            (
                CryptoError::DecryptionFailed("bad".into()).into(),
                ErrorClass::Failure,
            ),
            (
                StorageError::Connection("refused".into()).into(),
                ErrorClass::Failure,
            ),
        ];

        for (err, class) in cases {
            assert_eq!(err.kind().class(), class, "{err}");
        }
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::missing("cryptography.vault.auth.mount_path").to_string(),
            "Missing required field 'cryptography.vault.auth.mount_path'"
        );
        let err: CellarError = CryptoError::from(ConfigError::ValidationFailed(
            "at least one cryptography engine is required".into(),
        ))
        .into();
        assert!(err.to_string().contains("at least one cryptography engine"));
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let limited = CellarError::RateLimited {
            retry_after_seconds: 42,
        };
        assert_eq!(limited.retry_after_seconds(), Some(42));

        let other: CellarError = ContextError::Cancelled.into();
        assert_eq!(other.retry_after_seconds(), None);
    }
}

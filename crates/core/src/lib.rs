//! # Cellar Core
//!
//! Shared building blocks for the Cellar secret-sharing engine.
//!
//! ## Key Components
//!
//! - **Secret model**: [`SecretId`], [`SecretRecord`], [`SecretMetadata`], [`NewSecret`], [`SecretContent`]
//! - **Errors**: [`CellarError`] wrapping validation, context, rate-limit, storage and crypto failures
//! - **Health**: [`Health`], [`HealthStatus`] and the aggregated [`HealthReport`]
//! - **Operation context**: [`OperationContext`] carrying cancellation and an optional deadline
//! - **Clock**: [`Clock`] with [`SystemClock`] and the test-friendly [`ManualClock`]
//!
//! ## Usage
//!
//! ```rust
//! use cellar_core::{NewSecret, OperationContext, SecretId};
//!
//! let ctx = OperationContext::new();
//! let id = SecretId::generate();
//! let request = NewSecret::text("my very secret text", 1_900_000_000).with_access_limit(1);
//! assert!(ctx.check().is_ok());
//! assert_eq!(id.as_str().len(), 64);
//! # let _ = request;
//! ```

pub mod clock;
pub mod context;
pub mod error;
pub mod health;
pub mod secret;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::OperationContext;
pub use error::{
    CellarError, ConfigError, ContextError, CryptoError, ErrorClass, ErrorKind, Result, StorageError,
    ValidationError,
};
pub use health::{Health, HealthReport, HealthStatus, UNKNOWN};
pub use secret::{
    ContentType, NewSecret, SecretContent, SecretId, SecretMetadata, SecretRecord,
    format_expiration,
};

/// Common prelude for Cellar crates
pub mod prelude {
    pub use super::{
        CellarError, Clock, ContentType, Health, HealthStatus, OperationContext, Result,
        SecretContent, SecretId, SecretMetadata, SecretRecord,
    };
}

//! # Cellar Secrets
//!
//! The secret lifecycle on top of storage, crypto and rate limiting.
//!
//! ## Lifecycle
//!
//! ```text
//! NonExistent --create--> Active --access (count < limit)--> Active
//!                           |
//!                           +--delete / access reaching limit / TTL--> Deleted
//! ```
//!
//! Deleted and expired secrets are indistinguishable from ones that never
//! existed: every lookup returns `Ok(None)`.
//!
//! Use the free functions in [`lifecycle`] with explicit dependencies, or
//! wire everything once with [`Cellar`].

pub mod cellar;
pub mod lifecycle;
pub mod policy;

pub use cellar::{Cellar, CellarBuilder};
pub use lifecycle::{
    access_secret, create_secret, delete_secret, get_health, get_secret_metadata, hostname,
};
pub use policy::{Limits, MIN_EXPIRATION_SECONDS, SecretPolicy, limits};

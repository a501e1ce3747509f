//! # Cellar Storage
//!
//! Key-value backends and the secret store built on top of them.
//!
//! - [`KeyValueStore`]: the small set of atomic primitives Cellar needs
//! - [`MemoryStore`]: in-process backend with TTLs driven by a [`cellar_core::Clock`]
//! - `RedisStore` (feature `redis`): single Redis node via `ConnectionManager`
//! - [`SecretStore`]: persists a secret as a group of same-TTL keys
//!
//! ## Key layout
//!
//! A secret with id `{id}` occupies `secrets:{id}:{field}` for each of
//! `contenttype`, `content`, `access`, `accesslimit`, `expirationepoch` and
//! (for files) `filename`. All keys share the secret's remaining lifetime.

pub mod config;
pub mod keys;
pub mod kv;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod secret_store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::RedisConfig;
pub use keys::{SecretField, SecretKeys};
pub use kv::{KeyValueStore, WindowSnapshot};
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use secret_store::SecretStore;

//! # Cellar Config
//!
//! Settings for a Cellar process, loaded in layers: built-in defaults, then an
//! optional TOML file, then `CELLAR_*` environment variables.
//!
//! ```rust,ignore
//! let settings = SettingsLoader::new().with_file("cellar.toml").load()?;
//! let _guard = cellar_log::init(&settings.logging)?;
//! ```
//!
//! Section settings live with the crates that use them ([`RedisConfig`],
//! [`RateLimitConfig`], [`CryptographyConfig`], [`LoggingSettings`]); this
//! crate owns [`AppSettings`] and the loader.

mod app;
mod error;
mod loader;
mod settings;

pub use app::{AppSettings, MIN_MAX_EXPIRATION_SECONDS};
pub use error::{SettingsError, SettingsResult};
pub use loader::{ENV_PREFIX, ENV_SEPARATOR, SettingsLoader};
pub use settings::Settings;

pub use cellar_crypto::{CryptoBackend, CryptographyConfig};
pub use cellar_log::LoggingSettings;
pub use cellar_ratelimit::RateLimitConfig;
pub use cellar_storage::RedisConfig;

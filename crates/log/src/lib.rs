//! # Cellar Log
//!
//! Installs the process-wide `tracing` subscriber from [`LoggingSettings`].
//!
//! - `text` renders compact single-line events, `json` one object per line
//! - output goes to stdout and/or `cellar-YYYY-MM-DD.log` in an absolute directory
//! - `RUST_LOG` overrides the configured level
//!
//! ```rust,ignore
//! let _guard = cellar_log::init(&settings.logging)?;
//! tracing::info!(secret_id = %id, "Accessed secret");
//! ```

mod builder;
mod config;
mod error;

pub use builder::{LoggerGuard, build, init, log_file_name};
pub use config::{LogFormat, LoggingSettings};
pub use error::{LogError, LogResult};

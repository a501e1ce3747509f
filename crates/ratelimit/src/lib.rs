//! # Cellar Rate Limiting
//!
//! Per-caller quotas over a sliding-window log kept in the key-value store.
//!
//! Each caller and [`Tier`] owns one sorted set at
//! `cellar:ratelimit:{identifier}:{tier}` holding request timestamps in
//! nanoseconds. Every request, allowed or not, is recorded.
//!
//! ```rust,ignore
//! let limiter = SlidingWindowLimiter::new(store, RateLimitConfig::default());
//! let result = limiter.allow(&ctx, "203.0.113.7", Tier::Tier1).await?;
//! if let Some(err) = result.into_error() {
//!     return Err(err);
//! }
//! ```

pub mod config;
pub mod limiter;
pub mod result;
pub mod tier;

pub use config::RateLimitConfig;
pub use limiter::{RateLimiter, SlidingWindowLimiter, rate_limit_key};
pub use result::RateLimitResult;
pub use tier::Tier;

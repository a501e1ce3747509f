//! Rate limit settings.

use crate::tier::Tier;
use serde::{Deserialize, Serialize};

/// Window length and per-tier quotas.
///
/// Raw values are kept as configured; the accessors clamp every value to at
/// least 1 so a zero or negative setting can never lock callers out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_seconds: i64,
    pub tier1_requests_per_window: i64,
    pub tier2_requests_per_window: i64,
    pub tier3_requests_per_window: i64,
    pub health_check_requests_per_window: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: 60,
            tier1_requests_per_window: 10,
            tier2_requests_per_window: 30,
            tier3_requests_per_window: 60,
            health_check_requests_per_window: 120,
        }
    }
}

fn at_least_one(value: i64) -> u64 {
    value.max(1) as u64
}

impl RateLimitConfig {
    pub fn window_seconds(&self) -> u64 {
        at_least_one(self.window_seconds)
    }

    /// Requests allowed per window for `tier`.
    pub fn requests_per_window(&self, tier: Tier) -> u64 {
        at_least_one(match tier {
            Tier::Tier1 => self.tier1_requests_per_window,
            Tier::Tier2 => self.tier2_requests_per_window,
            Tier::Tier3 => self.tier3_requests_per_window,
            Tier::HealthCheck => self.health_check_requests_per_window,
        })
    }
}

//! Health model and aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version string reported when a backend's version cannot be determined.
pub const UNKNOWN: &str = "Unknown";

/// Health of a single dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Combine dependency statuses into one.
    ///
    /// A single status is returned unchanged. Otherwise all unhealthy is
    /// unhealthy, any other non-healthy status is degraded, and the rest is
    /// healthy.
    pub fn aggregate(statuses: &[Self]) -> Self {
        match statuses {
            [] => Self::Healthy,
            [single] => *single,
            _ if statuses.iter().all(|s| *s == Self::Unhealthy) => Self::Unhealthy,
            _ if statuses.iter().any(|s| *s != Self::Healthy) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "Healthy",
            Self::Degraded => "Degraded",
            Self::Unhealthy => "Unhealthy",
        })
    }
}

/// Health of a named dependency with its reported version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub name: String,
    pub status: HealthStatus,
    pub version: String,
}

impl Health {
    pub fn new(name: impl Into<String>, status: HealthStatus, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            version: version.into(),
        }
    }

    pub fn healthy(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Healthy, version)
    }

    /// Unhealthy with an unknown version.
    pub fn unhealthy(name: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Unhealthy, UNKNOWN)
    }
}

/// Aggregated service health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub host: String,
    pub version: String,
    pub status: HealthStatus,
    pub datastore: Health,
    pub encryption: Health,
}

impl HealthReport {
    /// Build a report, deriving the overall status from both dependencies.
    pub fn assess(
        host: impl Into<String>,
        version: impl Into<String>,
        datastore: Health,
        encryption: Health,
    ) -> Self {
        let status = HealthStatus::aggregate(&[datastore.status, encryption.status]);
        Self {
            host: host.into(),
            version: version.into(),
            status,
            datastore,
            encryption,
        }
    }
}

use cellar_core::CellarError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Decision for one request, with the numbers a boundary reports back
/// (`X-RateLimit-*`, `Retry-After`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Zero when allowed, the full window when denied
    pub retry_after_seconds: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitResult {
    /// The error a boundary should raise for a denied request.
    pub fn into_error(self) -> Option<CellarError> {
        (!self.allowed).then_some(CellarError::RateLimited {
            retry_after_seconds: self.retry_after_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::ErrorKind;

    fn result(allowed: bool) -> RateLimitResult {
        RateLimitResult {
            allowed,
            limit: 10,
            remaining: 0,
            retry_after_seconds: if allowed { 0 } else { 60 },
            reset_at: DateTime::from_timestamp(1_700_000_060, 0).unwrap(),
        }
    }

    #[test]
    fn allowed_has_no_error() {
        assert!(result(true).into_error().is_none());
    }

    #[test]
    fn denied_carries_retry_after() {
        let err = result(false).into_error().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.retry_after_seconds(), Some(60));
    }
}

//! Creation policy and the limits clients may query.

use cellar_config::AppSettings;
use cellar_core::{ContentType, NewSecret, ValidationError};
use serde::{Deserialize, Serialize};

/// Shortest lifetime a new secret may have.
pub const MIN_EXPIRATION_SECONDS: i64 = 10 * 60;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Limits applied when a secret is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretPolicy {
    /// Largest file payload in MiB; `0` disables the check
    pub max_file_size_mb: i64,
    /// Largest access limit a caller may request
    pub max_access_count: i64,
    /// Longest lifetime in seconds
    pub max_expiration_seconds: i64,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self {
            max_file_size_mb: 8,
            max_access_count: 100,
            max_expiration_seconds: 604_800,
        }
    }
}

impl From<&AppSettings> for SecretPolicy {
    fn from(app: &AppSettings) -> Self {
        Self {
            max_file_size_mb: app.max_file_size_mb(),
            max_access_count: app.max_access_count(),
            max_expiration_seconds: app.max_expiration_seconds(),
        }
    }
}

impl SecretPolicy {
    /// Check a creation request whose access limit is already normalized.
    ///
    /// `duration` is the remaining lifetime in seconds.
    pub fn validate(
        &self,
        request: &NewSecret,
        access_limit: i64,
        duration: i64,
    ) -> Result<(), ValidationError> {
        if duration < MIN_EXPIRATION_SECONDS {
            return Err(ValidationError::ExpirationTooSoon {
                min_seconds: MIN_EXPIRATION_SECONDS,
                actual_seconds: duration,
            });
        }
        if duration > self.max_expiration_seconds {
            return Err(ValidationError::ExpirationTooLate {
                max_seconds: self.max_expiration_seconds,
                actual_seconds: duration,
            });
        }
        if access_limit > 0 && access_limit > self.max_access_count {
            return Err(ValidationError::AccessLimitTooHigh {
                max: self.max_access_count,
                actual: access_limit,
            });
        }
        if request.content_type == ContentType::File && self.max_file_size_mb > 0 {
            let max_bytes = (self.max_file_size_mb as u64).saturating_mul(BYTES_PER_MB);
            let actual_bytes = request.content.len() as u64;
            if actual_bytes > max_bytes {
                return Err(ValidationError::ContentTooLarge {
                    max_bytes,
                    actual_bytes,
                });
            }
        }
        Ok(())
    }

    /// Runtime limits as reported to clients.
    pub fn limits(&self) -> Limits {
        Limits {
            max_file_size_mb: self.max_file_size_mb,
            max_access_count: self.max_access_count,
            max_expiration_seconds: self.max_expiration_seconds,
        }
    }
}

/// Limits a client may query before creating a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(rename = "maxFileSizeMB")]
    pub max_file_size_mb: i64,
    #[serde(rename = "maxAccessCount")]
    pub max_access_count: i64,
    #[serde(rename = "maxExpirationSeconds")]
    pub max_expiration_seconds: i64,
}

/// Pure projection of the policy.
pub fn limits(policy: &SecretPolicy) -> Limits {
    policy.limits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const NOW: i64 = 1_700_000_000;

    #[rstest]
    #[case(599, false)]
    #[case(600, true)]
    #[case(604_800, true)]
    #[case(604_801, false)]
    fn duration_bounds(#[case] duration: i64, #[case] ok: bool) {
        let policy = SecretPolicy::default();
        let request = NewSecret::text("x", NOW + duration);
        assert_eq!(policy.validate(&request, 0, duration).is_ok(), ok);
    }

    #[test]
    fn too_soon_message() {
        let err = SecretPolicy::default()
            .validate(&NewSecret::text("x", NOW + 30), 0, 30)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expiration must be at least 600 seconds in the future"
        );
    }

    #[rstest]
    #[case(0, true)]
    #[case(100, true)]
    #[case(101, false)]
    fn access_limit_bounds(#[case] limit: i64, #[case] ok: bool) {
        let policy = SecretPolicy::default();
        let request = NewSecret::text("x", NOW + 3600).with_access_limit(limit);
        assert_eq!(policy.validate(&request, limit, 3600).is_ok(), ok);
    }

    #[test]
    fn file_size_limit() {
        let policy = SecretPolicy {
            max_file_size_mb: 1,
            ..SecretPolicy::default()
        };
        let big = NewSecret::file(vec![0u8; 1024 * 1024 + 1], "big.bin", NOW + 3600);
        assert_eq!(
            policy.validate(&big, 0, 3600),
            Err(ValidationError::ContentTooLarge {
                max_bytes: 1024 * 1024,
                actual_bytes: 1024 * 1024 + 1,
            })
        );

        let unlimited = SecretPolicy {
            max_file_size_mb: 0,
            ..policy
        };
        assert!(unlimited.validate(&big, 0, 3600).is_ok());
    }

    #[test]
    fn limits_serialize_with_client_names() {
        let json = serde_json::to_value(limits(&SecretPolicy::default())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "maxFileSizeMB": 8,
                "maxAccessCount": 100,
                "maxExpirationSeconds": 604_800
            })
        );
    }
}

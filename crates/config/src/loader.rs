//! Layered settings loading
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables, `CELLAR_SECTION__FIELD=value`
//!
//! Environment values take the type of the default they replace, so
//! `CELLAR_REDIS__PASSWORD=1234` stays a string while
//! `CELLAR_APP__MAX_ACCESS_COUNT=50` becomes a number. Keys with no default
//! (the optional Vault auth blocks) are always strings.

use crate::error::{SettingsError, SettingsResult};
use crate::settings::Settings;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "CELLAR";

/// Separates nesting levels in environment variable names
pub const ENV_SEPARATOR: &str = "__";

const SENSITIVE_KEYS: &[&str] = &["password", "secret"];

/// Builds [`Settings`] from defaults, a file and the environment
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    prefix: String,
    vars: Option<Vec<(String, String)>>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            prefix: ENV_PREFIX.to_string(),
            vars: None,
        }
    }

    /// Merge a TOML file over the defaults. The file must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Load, merge and validate.
    pub fn load(&self) -> SettingsResult<Settings> {
        let mut data = serde_json::to_value(Settings::default())?;

        if let Some(path) = &self.file {
            merge_json(&mut data, read_toml(path)?);
            debug!(path = %path.display(), "Loaded settings file");
        }

        let applied = match &self.vars {
            Some(vars) => self.apply_env(&mut data, vars.iter().cloned()),
            None => self.apply_env(&mut data, std::env::vars()),
        };
        debug!(applied, prefix = %self.prefix, "Applied environment overrides");

        let settings: Settings = serde_json::from_value(data)?;
        settings.validate()?;

        if settings.redis.password.is_empty() {
            warn!(
                address = %settings.redis.address(),
                "redis password is empty, connecting without authentication"
            );
        }
        Ok(settings)
    }

    fn apply_env(&self, data: &mut Value, vars: impl IntoIterator<Item = (String, String)>) -> usize {
        let prefix = format!("{}_", self.prefix);
        let mut applied = 0;

        for (name, raw) in vars {
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let path: Vec<String> = rest
                .split(ENV_SEPARATOR)
                .map(str::to_ascii_lowercase)
                .collect();
            if path.iter().any(String::is_empty) {
                continue;
            }

            let existing = path
                .iter()
                .try_fold(&*data, |value, key| value.get(key.as_str()));
            let value = coerce(&raw, existing);
            trace!(
                variable = %name,
                value = %if is_sensitive(&path) { "[REDACTED]" } else { raw.as_str() },
                "Environment override"
            );

            let patch = path.iter().rev().fold(value, |inner, key| {
                let mut map = Map::new();
                map.insert(key.clone(), inner);
                Value::Object(map)
            });
            merge_json(data, patch);
            applied += 1;
        }
        applied
    }
}

fn read_toml(path: &Path) -> SettingsResult<Value> {
    let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|e| SettingsError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    raw.parse::<i64>().map(Value::from).ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    })
}

/// Shape `raw` like the value it replaces. Unparsable input is kept as a
/// string so deserialization reports the field.
fn coerce(raw: &str, existing: Option<&Value>) -> Value {
    let parsed = match existing {
        Some(Value::Bool(_)) => parse_bool(raw).map(Value::Bool),
        Some(Value::Number(_)) => parse_number(raw),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn is_sensitive(path: &[String]) -> bool {
    path.last()
        .is_some_and(|key| SENSITIVE_KEYS.iter().any(|s| key.contains(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn env_values_follow_default_types() {
        assert_eq!(coerce("50", Some(&json!(100))), json!(50));
        assert_eq!(coerce("TRUE", Some(&json!(false))), json!(true));
        assert_eq!(coerce("1234", Some(&json!(""))), json!("1234"));
        assert_eq!(coerce("1234", None), json!("1234"));
        assert_eq!(coerce("lots", Some(&json!(100))), json!("lots"));
    }

    #[test]
    fn merge_replaces_null_with_object() {
        let mut target = json!({"auth": {"mount_path": "approle", "approle": null}});
        merge_json(&mut target, json!({"auth": {"approle": {"role_id": "r"}}}));
        assert_eq!(
            target,
            json!({"auth": {"mount_path": "approle", "approle": {"role_id": "r"}}})
        );
    }

    #[test]
    fn apply_env_ignores_other_prefixes_and_empty_segments() {
        let loader = SettingsLoader::new();
        let mut data = json!({"app": {"max_access_count": 100}});
        let applied = loader.apply_env(
            &mut data,
            [
                ("CELLAR_APP__MAX_ACCESS_COUNT".to_string(), "7".to_string()),
                ("OTHER_APP__MAX_ACCESS_COUNT".to_string(), "8".to_string()),
                ("CELLAR_APP____X".to_string(), "9".to_string()),
            ],
        );
        assert_eq!(applied, 1);
        assert_eq!(data, json!({"app": {"max_access_count": 7}}));
    }

    #[test]
    fn sensitive_keys_are_detected() {
        assert!(is_sensitive(&["redis".into(), "password".into()]));
        assert!(is_sensitive(&["approle".into(), "secret_id".into()]));
        assert!(!is_sensitive(&["redis".into(), "host".into()]));
    }
}

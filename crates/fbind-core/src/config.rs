#![forbid(unsafe_code)]

//! Environment-driven defaults for bindings.
//!
//! Environment variables:
//! - `FBIND_ISOLATE_PANICS` (bool, default on): catch a panicking callback,
//!   log it and keep notifying the remaining subscribers.
//! - `FBIND_DEDUP_SUBSCRIBERS` (bool, default off): register a watcher at
//!   most once per property.
//!
//! Booleans accept `1/0`, `true/false`, `yes/no`, `on/off`.

use std::env;
use std::fmt;
use std::sync::OnceLock;

pub const ENV_ISOLATE_PANICS: &str = "FBIND_ISOLATE_PANICS";
pub const ENV_DEDUP_SUBSCRIBERS: &str = "FBIND_DEDUP_SUBSCRIBERS";

/// Process-wide binding defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactiveConfig {
    pub isolate_panics: bool,
    pub dedup_subscribers: bool,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            isolate_panics: true,
            dedup_subscribers: false,
        }
    }
}

/// Configuration parse diagnostics.
#[derive(Debug, Clone)]
pub struct ReactiveConfigParse {
    pub config: ReactiveConfig,
    pub errors: Vec<ConfigError>,
}

/// A rejected environment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    #[must_use]
    pub fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ReactiveConfig {
    /// Parse config from environment variables, ignoring bad values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ReactiveConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config using a custom environment lookup.
    pub fn from_env_with<F>(mut get: F) -> ReactiveConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_ISOLATE_PANICS) {
            match parse_bool(&value) {
                Some(parsed) => config.isolate_panics = parsed,
                None => errors.push(ConfigError::new(
                    "isolate_panics",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Some(value) = get(ENV_DEDUP_SUBSCRIBERS) {
            match parse_bool(&value) {
                Some(parsed) => config.dedup_subscribers = parsed,
                None => errors.push(ConfigError::new(
                    "dedup_subscribers",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        ReactiveConfigParse { config, errors }
    }

    /// Defaults read from the environment once per process.
    #[must_use]
    pub fn global() -> Self {
        static GLOBAL: OnceLock<ReactiveConfig> = OnceLock::new();
        *GLOBAL.get_or_init(|| {
            let parsed = Self::from_env_with_diagnostics();
            for err in &parsed.errors {
                tracing::warn!(error = %err, "ignoring invalid binding config");
            }
            parsed.config
        })
    }
}

/// Per-binding behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingOptions {
    /// Catch a panicking callback instead of unwinding through `notify`.
    pub isolate_panics: bool,
    /// Register with each property at most once.
    pub dedup_subscribers: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self::from(&ReactiveConfig::global())
    }
}

impl From<&ReactiveConfig> for BindingOptions {
    fn from(config: &ReactiveConfig) -> Self {
        Self {
            isolate_panics: config.isolate_panics,
            dedup_subscribers: config.dedup_subscribers,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(vars: &[(&str, &str)]) -> ReactiveConfigParse {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ReactiveConfig::from_env_with(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let parsed = parse(&[]);
        assert_eq!(parsed.config, ReactiveConfig::default());
        assert!(parsed.errors.is_empty());
        assert!(parsed.config.isolate_panics);
        assert!(!parsed.config.dedup_subscribers);
    }

    #[test]
    fn bool_spellings() {
        let parsed = parse(&[
            (ENV_ISOLATE_PANICS, "off"),
            (ENV_DEDUP_SUBSCRIBERS, " YES "),
        ]);
        assert!(!parsed.config.isolate_panics);
        assert!(parsed.config.dedup_subscribers);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn invalid_values_are_reported_and_ignored() {
        let parsed = parse(&[(ENV_DEDUP_SUBSCRIBERS, "maybe")]);
        assert!(!parsed.config.dedup_subscribers);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, "dedup_subscribers");
        assert_eq!(
            parsed.errors[0].to_string(),
            "dedup_subscribers=maybe (expected bool (1/0/true/false))"
        );
    }

    #[test]
    fn binding_options_follow_config() {
        let config = ReactiveConfig {
            isolate_panics: false,
            dedup_subscribers: true,
        };
        let options = BindingOptions::from(&config);
        assert!(!options.isolate_panics);
        assert!(options.dedup_subscribers);
    }
}

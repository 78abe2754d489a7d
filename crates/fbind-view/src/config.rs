#![forbid(unsafe_code)]

//! Mount configuration.
//!
//! Environment variables:
//! - `FBIND_VIEW_DELIMITERS`: interpolation delimiters as `open,close`
//!   (default `{{,}}`).
//! - `FBIND_VIEW_MODEL_ATTR`: attribute naming an input's bound path
//!   (default `model`). `v-model` is always accepted as well.

use std::env;

use fbind_core::ConfigError;

pub const ENV_DELIMITERS: &str = "FBIND_VIEW_DELIMITERS";
pub const ENV_MODEL_ATTR: &str = "FBIND_VIEW_MODEL_ATTR";

/// Attribute accepted on inputs regardless of configuration.
pub const MODEL_ATTR_ALIAS: &str = "v-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    pub open: String,
    pub close: String,
    pub model_attr: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            open: "{{".into(),
            close: "}}".into(),
            model_attr: "model".into(),
        }
    }
}

/// Parsed config plus rejected values.
#[derive(Debug, Clone)]
pub struct ViewConfigParse {
    pub config: ViewConfig,
    pub errors: Vec<ConfigError>,
}

impl ViewConfig {
    /// Read from the process environment, logging and skipping bad values.
    #[must_use]
    pub fn from_env() -> Self {
        let parsed = Self::from_env_with(|key| env::var(key).ok());
        for err in &parsed.errors {
            tracing::warn!(error = %err, "ignoring invalid view config");
        }
        parsed.config
    }

    /// Read using a custom environment lookup.
    pub fn from_env_with<F>(mut get: F) -> ViewConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_DELIMITERS) {
            match parse_delimiters(&value) {
                Some((open, close)) => {
                    config.open = open;
                    config.close = close;
                }
                None => errors.push(ConfigError::new(
                    "delimiters",
                    value,
                    "expected `open,close` with two non-empty parts",
                )),
            }
        }

        if let Some(value) = get(ENV_MODEL_ATTR) {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
                errors.push(ConfigError::new(
                    "model_attr",
                    value,
                    "expected a single attribute name",
                ));
            } else {
                config.model_attr = trimmed.to_string();
            }
        }

        ViewConfigParse { config, errors }
    }

    /// Whether `name` marks an input as bound.
    #[must_use]
    pub fn is_model_attr(&self, name: &str) -> bool {
        name == self.model_attr || name == MODEL_ATTR_ALIAS
    }
}

fn parse_delimiters(value: &str) -> Option<(String, String)> {
    let (open, close) = value.split_once(',')?;
    let (open, close) = (open.trim(), close.trim());
    if open.is_empty() || close.is_empty() {
        return None;
    }
    Some((open.to_string(), close.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(vars: &[(&'static str, &'static str)]) -> ViewConfigParse {
        ViewConfig::from_env_with(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
    }

    #[test]
    fn defaults() {
        let parsed = parse(&[]);
        assert_eq!(parsed.config, ViewConfig::default());
        assert!(parsed.errors.is_empty());
        assert!(parsed.config.is_model_attr("model"));
        assert!(parsed.config.is_model_attr("v-model"));
        assert!(!parsed.config.is_model_attr("value"));
    }

    #[test]
    fn custom_delimiters_and_attr() {
        let parsed = parse(&[(ENV_DELIMITERS, " <% , %> "), (ENV_MODEL_ATTR, "bind")]);
        assert_eq!(parsed.config.open, "<%");
        assert_eq!(parsed.config.close, "%>");
        assert!(parsed.config.is_model_attr("bind"));
        assert!(parsed.config.is_model_attr("v-model"));
        assert!(!parsed.config.is_model_attr("model"));
    }

    #[test]
    fn bad_values_keep_defaults() {
        let parsed = parse(&[(ENV_DELIMITERS, "{{"), (ENV_MODEL_ATTR, "two words")]);
        assert_eq!(parsed.config, ViewConfig::default());
        let fields: Vec<_> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["delimiters", "model_attr"]);
    }
}

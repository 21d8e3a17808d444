#![forbid(unsafe_code)]

//! Policy-as-data configuration for the propagator.
//!
//! ```toml
//! # fdash.toml
//! initial_call = true
//! coalesce_pending = true
//! trace_values = false
//! value_preview_len = 120
//! ```
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_toml_file("fdash.toml")?;
//! let config = RuntimeConfig::from_json_str(json)?.with_env_overrides();
//! ```
//!
//! Every field has a default, so a partial file only overrides what it names.

#[cfg(feature = "config")]
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for [`crate::Propagator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Run every computation once in [`crate::Propagator::start`].
    pub initial_call: bool,
    /// Merge a re-trigger into the pending queue entry instead of queueing
    /// the computation again.
    pub coalesce_pending: bool,
    /// Include (truncated) JSON values in debug events.
    pub trace_values: bool,
    /// Maximum characters of a value rendered when `trace_values` is set.
    pub value_preview_len: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_call: true,
            coalesce_pending: true,
            trace_values: false,
            value_preview_len: 120,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl RuntimeConfig {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `FDASH_INITIAL_CALL`, `FDASH_COALESCE` and `FDASH_TRACE_VALUES`.
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| {
            let raw = lookup(name)?;
            let parsed = parse_flag(&raw);
            if parsed.is_none() {
                tracing::warn!(variable = name, value = %raw, "ignoring unparseable flag");
            }
            parsed
        };
        if let Some(on) = flag("FDASH_INITIAL_CALL") {
            self.initial_call = on;
        }
        if let Some(on) = flag("FDASH_COALESCE") {
            self.coalesce_pending = on;
        }
        if let Some(on) = flag("FDASH_TRACE_VALUES") {
            self.trace_values = on;
        }
        self
    }

    /// Parse from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    #[cfg(feature = "config")]
    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Returns a list of problems. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.trace_values && self.value_preview_len == 0 {
            errors.push("value_preview_len must be > 0 when trace_values is set".into());
        }
        errors
    }

    /// Render `value` for a debug event, truncated to `value_preview_len`.
    pub(crate) fn preview(&self, value: &serde_json::Value) -> String {
        let rendered = value.to_string();
        match rendered.char_indices().nth(self.value_preview_len) {
            Some((cut, _)) => format!("{}...", &rendered[..cut]),
            None => rendered,
        }
    }
}

/// Errors raised while loading a [`RuntimeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_validates_clean() {
        let errors = RuntimeConfig::default().validate();
        assert!(errors.is_empty(), "default should validate: {errors:?}");
    }

    #[test]
    fn validate_catches_zero_preview() {
        let config = RuntimeConfig {
            trace_values: true,
            value_preview_len: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().iter().any(|e| e.contains("value_preview_len")));
    }

    #[test]
    fn overrides_parse_common_spellings() {
        let vars: HashMap<&str, &str> = [
            ("FDASH_INITIAL_CALL", "off"),
            ("FDASH_COALESCE", "0"),
            ("FDASH_TRACE_VALUES", "maybe"),
        ]
        .into_iter()
        .collect();
        let config = RuntimeConfig::default()
            .with_overrides(|name| vars.get(name).map(|v| (*v).to_string()));
        assert!(!config.initial_call);
        assert!(!config.coalesce_pending);
        assert!(!config.trace_values);
    }

    #[test]
    fn preview_truncates_long_values() {
        let config = RuntimeConfig {
            value_preview_len: 4,
            ..RuntimeConfig::default()
        };
        assert_eq!(config.preview(&serde_json::json!("abcdef")), "\"abc...");
        assert_eq!(config.preview(&serde_json::json!(1)), "1");
    }

    #[cfg(feature = "config")]
    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str("coalesce_pending = false\n").expect("parse");
        assert!(config.initial_call);
        assert!(!config.coalesce_pending);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_file_roundtrip() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"initial_call": false}}"#).expect("write");
        let config = RuntimeConfig::from_json_file(file.path()).expect("load");
        assert!(!config.initial_call);
        assert!(config.coalesce_pending);
    }

    #[cfg(feature = "config")]
    #[test]
    fn invalid_file_reports_validation() {
        let err = RuntimeConfig::from_toml_str("trace_values = true\nvalue_preview_len = 0\n")
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}

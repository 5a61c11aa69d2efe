//! Run configuration.
//!
//! Parameters arrive as an already-parsed key/value lookup
//! ([`ParameterSet`]); the typed configurations ([`DatasetConfig`],
//! [`TransportConfig`]) read what they need from it and can equally be
//! built in code from their `Default` presets and `with_*` methods.
//!
//! # Example
//!
//! ```
//! use ichthyop_rs::config::{ParameterSet, TransportConfig};
//!
//! let params: ParameterSet = [("time_step", "1800"), ("scheme", "rk4"), ("seed", "7")]
//!     .into_iter()
//!     .collect();
//! let transport = TransportConfig::from_parameters(&params).unwrap();
//! assert_eq!(transport.dt, 1800.0);
//! assert_eq!(transport.seed, Some(7));
//! ```

mod dataset;
mod transport;

pub use dataset::{DatasetConfig, GridConvention, VariableNames};
pub use transport::TransportConfig;

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

/// Error type for configuration lookups.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Required key absent
    #[error("missing parameter '{0}'")]
    MissingKey(String),

    /// Value could not be parsed
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Selector outside its set of choices
    #[error("unknown {key} '{value}', expected one of {expected}")]
    UnknownSelector {
        key: String,
        value: String,
        expected: String,
    },
}

/// Key/value parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value; blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Parsed value, `None` when absent.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse(key)?.unwrap_or(default))
    }

    /// Boolean flag (`true/false`, `yes/no`, `on/off`, `1/0`).
    pub fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                reason: "expected a boolean".into(),
            }),
        }
    }

    /// Comma-separated list.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Value parsed with a selector function returning `None` on unknown input.
    pub(crate) fn select<T>(
        &self,
        key: &str,
        expected: &str,
        pick: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => pick(&value.to_ascii_lowercase())
                .map(Some)
                .ok_or_else(|| ConfigError::UnknownSelector {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: expected.to_string(),
                }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ParameterSet {
        ParameterSet::new()
            .with("dt", "3600")
            .with("blank", "  ")
            .with("enabled", "Yes")
            .with("tracers", "chl, oxygen,")
    }

    #[test]
    fn test_lookup() {
        let p = params();
        assert_eq!(p.get("dt"), Some("3600"));
        assert_eq!(p.get("blank"), None);
        assert_eq!(
            p.require("missing"),
            Err(ConfigError::MissingKey("missing".into()))
        );
        assert_eq!(p.list("tracers"), vec!["chl".to_string(), "oxygen".to_string()]);
    }

    #[test]
    fn test_typed_values() {
        let p = params();
        assert_eq!(p.parse::<f64>("dt").unwrap(), Some(3600.0));
        assert_eq!(p.parse_or::<u64>("seed", 12).unwrap(), 12);
        assert_eq!(p.flag("enabled").unwrap(), Some(true));
        assert!(p.parse::<u32>("enabled").is_err());
        assert!(p.flag("dt").is_err());
    }

    #[test]
    fn test_selector() {
        let p = params().with("scheme", "RK4");
        let pick = |s: &str| match s {
            "euler" => Some(1),
            "rk4" => Some(4),
            _ => None,
        };
        assert_eq!(p.select("scheme", "euler, rk4", pick).unwrap(), Some(4));
        let bad = params().with("scheme", "leapfrog");
        assert!(matches!(
            bad.select("scheme", "euler, rk4", pick),
            Err(ConfigError::UnknownSelector { .. })
        ));
    }
}

//! Declarative run configuration: the profile list, the results-store
//! path, and the output toggles.
//!
//! Configuration errors are fatal before any connection is attempted;
//! the only tolerated gap is a profile without an address, which is kept
//! and skipped with its own error result during the run.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(String),
    #[error("cannot read configuration file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration document: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("no connection profiles defined")]
    NoProfiles,
    #[error("profile {index}: required field '{field}' is missing or empty")]
    MissingField { index: usize, field: &'static str },
    #[error("duplicate connection name '{0}'")]
    DuplicateName(String),
}

/// Tri-state capability override: `true`/`false` pin the tier, `"auto"`
/// (the default) lets the probe battery decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilityOverride {
    #[default]
    Auto,
    Explicit(bool),
}

impl<'de> Deserialize<'de> for CapabilityOverride {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OverrideVisitor;

        impl Visitor<'_> for OverrideVisitor {
            type Value = CapabilityOverride;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("true, false, or the string \"auto\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(CapabilityOverride::Explicit(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.eq_ignore_ascii_case("auto") {
                    Ok(CapabilityOverride::Auto)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(OverrideVisitor)
    }
}

/// One source instance to analyze. Read-only during a run.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    /// Unique identity; the results store upserts by this name.
    pub name: String,
    /// Easy connect address (`host:port/service`). A profile without an
    /// address is skipped with a "missing address" error result.
    #[serde(default)]
    pub address: Option<String>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Explicit scope schema; set, it wins over every tier rule.
    #[serde(default)]
    pub target_schema: Option<String>,
    #[serde(default)]
    pub elevated: CapabilityOverride,
    /// Whole-instance scope (elevated tier only) vs single-schema.
    #[serde(default)]
    pub whole_instance: bool,
}

/// Estimator report artifacts to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorOutputMode {
    HtmlOnly,
    #[default]
    HtmlAndText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// SQLite results-store path.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Directory for estimator artifacts and the run summary. Defaults to
    /// a timestamped directory next to the working directory.
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default = "default_true")]
    pub analyze_sizes: bool,
    #[serde(default)]
    pub estimator_output_mode: EstimatorOutputMode,
    pub profiles: Vec<ConnectionProfile>,
}

fn default_store_path() -> String {
    "migration_inventory.db".to_string()
}

fn default_true() -> bool {
    true
}

impl AnalyzerConfig {
    /// Load and validate a configuration document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: AnalyzerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        let mut seen = HashSet::new();
        for (index, profile) in self.profiles.iter().enumerate() {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "name",
                });
            }
            if profile.username.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "username",
                });
            }
            if profile.password.is_empty() {
                return Err(ConfigError::MissingField {
                    index,
                    field: "password",
                });
            }
            if !seen.insert(profile.name.clone()) {
                return Err(ConfigError::DuplicateName(profile.name.clone()));
            }
        }
        Ok(())
    }
}

/// Output toggles, resolved once from configuration + command line and
/// passed explicitly into the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub analyze_sizes: bool,
    pub estimator_mode: EstimatorOutputMode,
    /// Side channel for the secondary tabular writers; the core only
    /// carries the flag through.
    pub tabular: bool,
}

impl OutputOptions {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        OutputOptions {
            analyze_sizes: config.analyze_sizes,
            estimator_mode: config.estimator_output_mode,
            tabular: false,
        }
    }
}

/// Starter configuration written next to a missing config file so the
/// operator has something concrete to edit.
pub const SAMPLE_CONFIG: &str = r#"{
  "store_path": "migration_inventory.db",
  "analyze_sizes": true,
  "estimator_output_mode": "html_and_text",
  "profiles": [
    {
      "name": "BILLING_PROD",
      "address": "db1.example.com:1521/BILLING",
      "username": "BILLING",
      "password": "change_me",
      "description": "Billing production instance",
      "elevated": "auto",
      "whole_instance": false
    },
    {
      "name": "WAREHOUSE",
      "address": "db2.example.com:1521/DWH",
      "username": "ETL_ADMIN",
      "password": "change_me",
      "elevated": true,
      "whole_instance": true,
      "target_schema": null
    }
  ]
}
"#;

pub fn write_sample(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, SAMPLE_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<AnalyzerConfig, ConfigError> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles[0].elevated, CapabilityOverride::Auto);
        assert_eq!(
            config.profiles[1].elevated,
            CapabilityOverride::Explicit(true)
        );
        assert!(config.profiles[1].whole_instance);
    }

    #[test]
    fn test_missing_password_is_fatal() {
        let err = parse(
            r#"{"profiles":[{"name":"A","address":"h:1521/S","username":"U","password":""}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "password",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_address_is_not_fatal() {
        let config =
            parse(r#"{"profiles":[{"name":"A","username":"U","password":"p"}]}"#).unwrap();
        assert!(config.profiles[0].address.is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = parse(
            r#"{"profiles":[
                {"name":"A","username":"U","password":"p"},
                {"name":"A","username":"V","password":"q"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(name) if name == "A"));
    }

    #[test]
    fn test_override_rejects_unknown_keyword() {
        let result: Result<CapabilityOverride, _> = serde_json::from_str("\"maybe\"");
        assert!(result.is_err());
        let auto: CapabilityOverride = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(auto, CapabilityOverride::Auto);
        let pinned: CapabilityOverride = serde_json::from_str("false").unwrap();
        assert_eq!(pinned, CapabilityOverride::Explicit(false));
    }

    #[test]
    fn test_defaults() {
        let config =
            parse(r#"{"profiles":[{"name":"A","username":"U","password":"p"}]}"#).unwrap();
        assert!(config.analyze_sizes);
        assert_eq!(
            config.estimator_output_mode,
            EstimatorOutputMode::HtmlAndText
        );
        assert_eq!(config.store_path, "migration_inventory.db");
    }
}

//! Configuration parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::metrics::GradeThresholds;
use crate::runner::ClockConfig;
use crate::types::{Language, PolicyVersion};

use super::schema::validate_config_schema;

/// Errors that can occur when loading or validating a configuration.
///
/// All of them are fatal: a run with a bad configuration aborts before any
/// conversation is simulated.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Unknown policy version: {0}")]
    UnknownPolicyVersion(String),

    #[error("Invalid grade thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_conversation_count() -> usize {
    6
}

fn default_seed() -> u64 {
    42
}

fn default_min_turns() -> usize {
    4
}

fn default_max_turns() -> usize {
    6
}

fn default_languages() -> Vec<Language> {
    Language::ALL.to_vec()
}

fn default_farewell() -> bool {
    true
}

/// Settings for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Rule table used for every agent turn
    pub policy_version: PolicyVersion,

    /// Number of conversations to generate
    #[serde(default = "default_conversation_count")]
    pub conversation_count: usize,

    /// Seed for the conversation source
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Fewest customer turns per conversation
    #[serde(default = "default_min_turns")]
    pub min_turns: usize,

    /// Most customer turns per conversation
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Languages customers may speak
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,

    /// Whether every conversation ends with a farewell utterance
    #[serde(default = "default_farewell")]
    pub farewell: bool,

    #[serde(default)]
    pub grade_thresholds: GradeThresholds,

    #[serde(default)]
    pub clock: ClockConfig,
}

impl EvaluationConfig {
    /// A configuration with every setting at its default.
    pub fn new(policy_version: PolicyVersion) -> Self {
        Self {
            policy_version,
            conversation_count: default_conversation_count(),
            seed: default_seed(),
            min_turns: default_min_turns(),
            max_turns: default_max_turns(),
            languages: default_languages(),
            farewell: default_farewell(),
            grade_thresholds: GradeThresholds::default(),
            clock: ClockConfig::default(),
        }
    }

    /// Parse a configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a configuration from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a configuration file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        // Report an unknown version as such rather than as a schema mismatch.
        if let Some(version) = value.get("policy_version").and_then(|v| v.as_str()) {
            version.parse::<PolicyVersion>()?;
        }

        validate_config_schema(&value).map_err(ConfigError::SchemaError)?;

        let config: EvaluationConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the constraints the schema cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grade_thresholds.validate()?;

        if self.min_turns == 0 {
            return Err(ConfigError::Invalid("min_turns must be at least 1".to_string()));
        }

        if self.min_turns > self.max_turns {
            return Err(ConfigError::Invalid(format!(
                "min_turns ({}) exceeds max_turns ({})",
                self.min_turns, self.max_turns
            )));
        }

        if self.languages.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one language is required".to_string(),
            ));
        }

        if let ClockConfig::FixedStep { step_us: 0 } = self.clock {
            return Err(ConfigError::Invalid(
                "fixed_step clock needs a step_us above 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
policy_version: "v1"
conversation_count: 10
seed: 7
min_turns: 2
max_turns: 3
languages:
  - english
  - spanish
clock:
  kind: fixed_step
  step_us: 50
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = EvaluationConfig::from_yaml(VALID_CONFIG).unwrap();
        assert_eq!(config.policy_version, PolicyVersion::V1);
        assert_eq!(config.conversation_count, 10);
        assert_eq!(config.languages, vec![Language::English, Language::Spanish]);
        assert_eq!(config.clock, ClockConfig::FixedStep { step_us: 50 });
        assert!(config.farewell);
        assert_eq!(config.grade_thresholds, GradeThresholds::default());
    }

    #[test]
    fn test_defaults_applied() {
        let config = EvaluationConfig::from_json(r#"{ "policy_version": "v0" }"#).unwrap();
        assert_eq!(config, EvaluationConfig::new(PolicyVersion::V0));
    }

    #[test]
    fn test_unknown_policy_version() {
        let result = EvaluationConfig::from_yaml("policy_version: \"v9\"");
        assert!(matches!(
            result,
            Err(ConfigError::UnknownPolicyVersion(v)) if v == "v9"
        ));
    }

    #[test]
    fn test_descending_thresholds_required() {
        let yaml = r#"
policy_version: "v1"
grade_thresholds:
  a: 80
  b: 90
  c: 65
  d: 50
"#;
        assert!(matches!(
            EvaluationConfig::from_yaml(yaml),
            Err(ConfigError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn test_turn_range_checked() {
        let yaml = r#"
policy_version: "v1"
min_turns: 5
max_turns: 3
"#;
        assert!(matches!(
            EvaluationConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_schema_errors_surface() {
        let yaml = r#"
policy_version: "v1"
conversation_count: -1
"#;
        assert!(matches!(
            EvaluationConfig::from_yaml(yaml),
            Err(ConfigError::SchemaError(errors)) if !errors.is_empty()
        ));
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let yaml = include_str!("../../../../configs/evaluation.yaml");
        let config = EvaluationConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.conversation_count, 12);
        assert_eq!(config.clock, ClockConfig::FixedStep { step_us: 25 });
    }
}

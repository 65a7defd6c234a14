//! JSON Schema validation for evaluation configurations.
//!
//! Every configuration must validate against spec/evaluation.schema.json
//! before it is deserialized.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded configuration schema (loaded at compile time).
const CONFIG_SCHEMA_JSON: &str = include_str!("../../../../spec/evaluation.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a configuration JSON value against the schema.
///
/// Returns every validation error message, each suffixed with the instance
/// path it refers to.
pub fn validate_config_schema(config_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(config_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_passes_schema() {
        let value = serde_json::json!({ "policy_version": "v1" });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_full_config_passes_schema() {
        let value = serde_json::json!({
            "policy_version": "v0",
            "conversation_count": 12,
            "seed": 7,
            "min_turns": 2,
            "max_turns": 5,
            "languages": ["english", "french"],
            "farewell": false,
            "grade_thresholds": { "a": 95, "b": 85, "c": 70, "d": 55 },
            "clock": { "kind": "fixed_step", "step_us": 100 }
        });
        assert!(validate_config_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_policy_version_fails() {
        let value = serde_json::json!({ "conversation_count": 3 });
        let errors = validate_config_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_unknown_language_fails() {
        let value = serde_json::json!({
            "policy_version": "v1",
            "languages": ["english", "german"]
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_threshold_out_of_range_fails() {
        let value = serde_json::json!({
            "policy_version": "v1",
            "grade_thresholds": { "a": 120, "b": 80, "c": 65, "d": 50 }
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_fixed_step_clock_requires_step() {
        let value = serde_json::json!({
            "policy_version": "v1",
            "clock": { "kind": "fixed_step" }
        });
        assert!(validate_config_schema(&value).is_err());
    }

    #[test]
    fn test_additional_properties_fail() {
        let value = serde_json::json!({
            "policy_version": "v1",
            "retries": 3
        });
        assert!(validate_config_schema(&value).is_err());
    }
}

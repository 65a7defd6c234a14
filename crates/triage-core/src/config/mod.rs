//! Evaluation configuration.
//!
//! Configurations are structured data validated against JSON Schema before
//! they are deserialized. This module handles parsing YAML/JSON
//! configurations and validating them.

mod parser;
mod schema;

pub use parser::{ConfigError, EvaluationConfig};
pub use schema::validate_config_schema;

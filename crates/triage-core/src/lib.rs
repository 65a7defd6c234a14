//! # triage-core
//!
//! Deterministic evaluation engine for multi-agent dialogue routing.
//!
//! This crate answers, for a versioned routing policy:
//! - Does each customer turn reach the right specialist?
//! - Are tools called with the right actions and params?
//! - Does the conversation end cleanly?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same seed, policy and clock always produce the same report
//! 2. **No LLM calls**: Routing and replies are rule-based
//! 3. **Recomputable**: Every report carries the per-turn log its metrics came from
//! 4. **Parallel-safe**: Conversations never read each other's turns
//!
//! ## Example
//!
//! ```rust,ignore
//! use triage_core::{evaluate, EvaluationConfig, PolicyVersion};
//!
//! let config = EvaluationConfig::new(PolicyVersion::V1);
//! let report = evaluate(&config)?;
//!
//! println!("{}", report.summary());
//! println!("{}", report.to_json()?);
//! ```

pub mod config;
pub mod metrics;
pub mod policy;
pub mod report;
pub mod runner;
pub mod source;
pub mod tools;
pub mod types;

// Re-export main types at crate root
pub use config::{validate_config_schema, ConfigError, EvaluationConfig};
pub use metrics::{ContextPredicate, EntityReusePredicate, Grade, GradeThresholds, MetricsEngine};
pub use policy::{policy_for, AgentAction, PolicyError, RoutingPolicy, V0Policy, V1Policy};
pub use report::{Analysis, Grading, Report, RequiredMetrics, Score, SupplementaryMetrics};
pub use runner::{
    ClockConfig, SimulationError, SimulationOutcome, SimulationRunner, SimulationWarning,
};
pub use source::{ConversationScript, ConversationSource, CustomerUtterance, ScriptedSource, StaticSource};
pub use types::{
    AgentId, AgentTurn, Conversation, CustomerTurn, Intent, Language, PolicyVersion,
    RoutingDecision, Slot, ToolCall, Transcript, Turn, END_CALL,
};

use thiserror::Error;
use tracing::info;

/// Errors that abort an evaluation before any conversation is simulated.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Run a full evaluation: generate scripts, simulate them under the
/// configured policy and score the transcript.
pub fn evaluate(config: &EvaluationConfig) -> Result<Report, EvaluationError> {
    config.validate()?;
    let scripts = ScriptedSource::from_config(config).scripts();
    evaluate_scripts(config, &scripts)
}

/// Evaluate scripts supplied by the caller.
///
/// The source settings of `config` are ignored; policy version, clock and
/// grade thresholds apply.
pub fn evaluate_scripts(
    config: &EvaluationConfig,
    scripts: &[ConversationScript],
) -> Result<Report, EvaluationError> {
    config.validate()?;

    info!(
        policy = %config.policy_version,
        conversations = scripts.len(),
        "starting evaluation"
    );

    let runner = SimulationRunner::for_version(config.policy_version, config.clock);
    let outcome = runner.run(scripts);

    let engine = MetricsEngine::new(config.grade_thresholds);
    Ok(engine.report(config.policy_version, outcome.transcript, outcome.warnings))
}

/// Evaluate v0 and v1 on the same generated scripts.
pub fn compare(config: &EvaluationConfig) -> Result<(Report, Report), EvaluationError> {
    config.validate()?;
    let scripts = ScriptedSource::from_config(config).scripts();

    let with_version = |policy_version| EvaluationConfig {
        policy_version,
        ..config.clone()
    };

    let baseline = evaluate_scripts(&with_version(PolicyVersion::V0), &scripts)?;
    let corrected = evaluate_scripts(&with_version(PolicyVersion::V1), &scripts)?;
    Ok((baseline, corrected))
}

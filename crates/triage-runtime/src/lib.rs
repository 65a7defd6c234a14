//! # triage-runtime
//!
//! Parallel evaluation for triage.
//!
//! `triage-core` simulates conversations one after the other. This crate
//! fans them out to the blocking thread pool, waits for every one of them,
//! and scores the reassembled transcript through a report cache.
//!
//! ## Important
//!
//! Parallelism never changes a report: with a fixed clock the output is
//! identical to `triage_core::evaluate`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use triage_core::{EvaluationConfig, PolicyVersion};
//! use triage_runtime::EvaluationOrchestrator;
//!
//! let orchestrator = EvaluationOrchestrator::from_env()?;
//! let report = orchestrator
//!     .evaluate(&EvaluationConfig::new(PolicyVersion::V1))
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod orchestrator;

pub use cache::{CacheKey, ReportCache};
pub use config::RuntimeConfig;
pub use orchestrator::EvaluationOrchestrator;

use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinError;

use triage_core::ConfigError;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid runtime configuration: {0}")]
    Config(String),

    #[error("Invalid evaluation configuration: {0}")]
    Evaluation(#[from] ConfigError),

    #[error("Worker pool closed: {0}")]
    WorkerPool(#[from] AcquireError),

    #[error("Simulation worker failed: {0}")]
    Worker(#[from] JoinError),
}

//! Parallel evaluation orchestrator.
//!
//! The orchestrator runs an evaluation in three phases:
//! - Fan-out: every script is simulated on the blocking pool, at most
//!   `workers` at a time
//! - Barrier: scoring starts only once every conversation has finished
//! - Fan-in: conversations are reassembled in script order and scored
//!   through the report cache
//!
//! The resulting report is identical to the one `triage_core::evaluate`
//! produces for the same configuration and a fixed clock.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use triage_core::{
    ConversationScript, ConversationSource, EvaluationConfig, MetricsEngine, PolicyVersion,
    Report, ScriptedSource, SimulationOutcome, SimulationRunner, SimulationWarning, Transcript,
};

use crate::cache::ReportCache;
use crate::config::RuntimeConfig;
use crate::RuntimeError;

pub struct EvaluationOrchestrator {
    config: RuntimeConfig,
    semaphore: Arc<Semaphore>,
    cache: ReportCache,
}

impl EvaluationOrchestrator {
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.workers)),
            cache: ReportCache::from_config(&config),
            config,
        })
    }

    /// An orchestrator configured from `TRIAGE_*` environment variables.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::new(RuntimeConfig::from_env()?)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    /// Generate scripts from `config` and evaluate them.
    pub async fn evaluate(&self, config: &EvaluationConfig) -> Result<Arc<Report>, RuntimeError> {
        config.validate()?;
        let scripts = ScriptedSource::from_config(config).scripts();
        self.evaluate_scripts(config, &scripts).await
    }

    /// Evaluate caller-supplied scripts under `config`'s policy and clock.
    pub async fn evaluate_scripts(
        &self,
        config: &EvaluationConfig,
        scripts: &[ConversationScript],
    ) -> Result<Arc<Report>, RuntimeError> {
        config.validate()?;
        let runner = SimulationRunner::for_version(config.policy_version, config.clock);

        let outcome = self.simulate_all(&runner, scripts).await?;

        let engine = MetricsEngine::new(config.grade_thresholds);
        Ok(self.cache.report(&engine, config.policy_version, outcome).await)
    }

    /// v0 and v1 on the same generated scripts.
    pub async fn compare(
        &self,
        config: &EvaluationConfig,
    ) -> Result<(Arc<Report>, Arc<Report>), RuntimeError> {
        config.validate()?;
        let scripts = ScriptedSource::from_config(config).scripts();

        let with_version = |policy_version| EvaluationConfig {
            policy_version,
            ..config.clone()
        };

        let baseline = self
            .evaluate_scripts(&with_version(PolicyVersion::V0), &scripts)
            .await?;
        let corrected = self
            .evaluate_scripts(&with_version(PolicyVersion::V1), &scripts)
            .await?;
        Ok((baseline, corrected))
    }

    /// Simulate every script concurrently and wait for all of them.
    pub async fn simulate_all(
        &self,
        runner: &SimulationRunner,
        scripts: &[ConversationScript],
    ) -> Result<SimulationOutcome, RuntimeError> {
        let tasks = scripts.iter().cloned().map(|script| {
            let runner = runner.clone();
            let semaphore = Arc::clone(&self.semaphore);
            async move {
                let _permit = semaphore.acquire_owned().await?;
                let simulated = tokio::task::spawn_blocking(move || runner.simulate(&script)).await?;
                Ok::<_, RuntimeError>(simulated)
            }
        });

        // join_all keeps results in script order
        let results = join_all(tasks).await;

        let mut conversations = Vec::with_capacity(scripts.len());
        let mut warnings = Vec::new();
        for result in results {
            match result? {
                Ok(conversation) => conversations.push(conversation),
                Err(error) => {
                    warn!(conv_id = error.conv_id, turn_id = error.turn_id, %error, "conversation excluded");
                    warnings.push(SimulationWarning::from(&error));
                }
            }
        }

        info!(
            policy = %runner.policy_version(),
            simulated = conversations.len(),
            excluded = warnings.len(),
            workers = self.config.workers,
            "parallel simulation finished"
        );

        Ok(SimulationOutcome {
            transcript: Transcript::new(conversations),
            warnings,
        })
    }
}

//! Report cache.
//!
//! Scoring a transcript is deterministic, so a report can be reused for any
//! later request with the same transcript, warnings, thresholds and context
//! predicate.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};

use triage_core::{GradeThresholds, MetricsEngine, PolicyVersion, Report, SimulationOutcome};

use crate::config::RuntimeConfig;

/// Identity of a scoring request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    policy_version: PolicyVersion,
    outcome_hash: u64,
    thresholds: [u64; 4],
    predicate: String,
}

impl CacheKey {
    pub fn new(
        policy_version: PolicyVersion,
        outcome: &SimulationOutcome,
        engine: &MetricsEngine,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            policy_version,
            outcome_hash: hash_outcome(outcome)?,
            thresholds: threshold_bits(engine.thresholds()),
            predicate: engine.predicate_name().to_string(),
        })
    }
}

/// Scored reports keyed by their inputs.
pub struct ReportCache {
    cache: Cache<CacheKey, Arc<Report>>,
}

impl ReportCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.cache_capacity, config.cache_ttl)
    }

    /// Score `outcome`, or return the report already scored for it.
    pub async fn report(
        &self,
        engine: &MetricsEngine,
        policy_version: PolicyVersion,
        outcome: SimulationOutcome,
    ) -> Arc<Report> {
        let key = match CacheKey::new(policy_version, &outcome, engine) {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "transcript not hashable, scoring without cache");
                return Arc::new(engine.report(policy_version, outcome.transcript, outcome.warnings));
            }
        };

        let entry = self
            .cache
            .entry(key)
            .or_insert_with(async {
                Arc::new(engine.report(policy_version, outcome.transcript, outcome.warnings))
            })
            .await;

        if entry.is_fresh() {
            debug!(policy = %policy_version, "report cache miss");
        } else {
            debug!(policy = %policy_version, "report cache hit");
        }
        entry.into_value()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Report>> {
        self.cache.get(key).await
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Flush pending maintenance so counts are current.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

fn hash_outcome(outcome: &SimulationOutcome) -> Result<u64, serde_json::Error> {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(&outcome.transcript)?.hash(&mut hasher);
    serde_json::to_string(&outcome.warnings)?.hash(&mut hasher);
    Ok(hasher.finish())
}

fn threshold_bits(thresholds: &GradeThresholds) -> [u64; 4] {
    [
        thresholds.a.to_bits(),
        thresholds.b.to_bits(),
        thresholds.c.to_bits(),
        thresholds.d.to_bits(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{ClockConfig, ConversationSource, ScriptedSource, SimulationRunner};

    fn outcome(version: PolicyVersion, seed: u64) -> SimulationOutcome {
        let source = ScriptedSource {
            conversation_count: 3,
            seed,
            ..ScriptedSource::default()
        };
        SimulationRunner::for_version(version, ClockConfig::FixedStep { step_us: 7 })
            .run(&source.scripts())
    }

    #[tokio::test]
    async fn test_same_outcome_hits_cache() {
        let cache = ReportCache::default();
        let engine = MetricsEngine::default();

        let first = cache.report(&engine, PolicyVersion::V1, outcome(PolicyVersion::V1, 1)).await;
        let second = cache.report(&engine, PolicyVersion::V1, outcome(PolicyVersion::V1, 1)).await;

        assert!(Arc::ptr_eq(&first, &second));
        cache.sync().await;
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_different_inputs_miss() {
        let cache = ReportCache::default();
        let engine = MetricsEngine::default();
        let strict = MetricsEngine::new(GradeThresholds {
            a: 99.0,
            b: 95.0,
            c: 90.0,
            d: 85.0,
        });

        let base = cache.report(&engine, PolicyVersion::V1, outcome(PolicyVersion::V1, 1)).await;
        let other_seed = cache.report(&engine, PolicyVersion::V1, outcome(PolicyVersion::V1, 2)).await;
        let other_grading = cache.report(&strict, PolicyVersion::V1, outcome(PolicyVersion::V1, 1)).await;

        assert!(!Arc::ptr_eq(&base, &other_seed));
        assert!(!Arc::ptr_eq(&base, &other_grading));
        assert_eq!(other_grading.grading.thresholds.a, 99.0);

        cache.sync().await;
        assert_eq!(cache.entry_count(), 3);
    }

    #[tokio::test]
    async fn test_cached_report_matches_direct_scoring() {
        let cache = ReportCache::default();
        let engine = MetricsEngine::default();
        let simulated = outcome(PolicyVersion::V0, 9);

        let key = CacheKey::new(PolicyVersion::V0, &simulated, &engine).unwrap();
        assert!(cache.get(&key).await.is_none());

        let direct = engine.report(
            PolicyVersion::V0,
            simulated.transcript.clone(),
            simulated.warnings.clone(),
        );
        let cached = cache.report(&engine, PolicyVersion::V0, simulated).await;

        assert_eq!(*cached, direct);
        assert!(cache.get(&key).await.is_some());
    }
}

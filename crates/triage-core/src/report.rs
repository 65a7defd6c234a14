//! Evaluation report.
//!
//! A report carries the aggregate metrics together with the full per-turn
//! log they were computed from, so every figure can be recomputed from the
//! report alone.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::metrics::{Grade, GradeThresholds};
use crate::runner::SimulationWarning;
use crate::types::{PolicyVersion, Transcript};

/// Unit of every latency figure in a report.
pub const LATENCY_UNIT: &str = "microseconds";

const UNDEFINED: &str = "undefined";

/// A metric value, or undefined when its denominator is zero.
///
/// Serializes as a plain number or the string `"undefined"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Value(f64),
    Undefined,
}

impl Score {
    /// `numerator / denominator`, undefined for a zero denominator.
    pub fn ratio(numerator: f64, denominator: usize) -> Self {
        if denominator == 0 {
            Score::Undefined
        } else {
            Score::Value(numerator / denominator as f64)
        }
    }

    /// `count / total` as a percentage.
    pub fn percent(count: usize, total: usize) -> Self {
        Self::ratio(count as f64 * 100.0, total)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Score::Undefined)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Value(v) => write!(f, "{:.2}", v),
            Score::Undefined => f.write_str(UNDEFINED),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Value(v) => serializer.serialize_f64(*v),
            Score::Undefined => serializer.serialize_str(UNDEFINED),
        }
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Score::Value(v)),
            Repr::Text(s) if s == UNDEFINED => Ok(Score::Undefined),
            Repr::Text(s) => Err(de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a number or \"undefined\"",
            )),
        }
    }
}

/// Metrics every evaluation must report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredMetrics {
    /// Percentage of pairs routed to the expected agent
    pub routing_accuracy: Score,
    pub misrouting_count: usize,
    /// Percentage of conversations with a valid turn structure
    pub flow_adherence: Score,
    /// Percentage of tool calls allowed for their agent with complete params
    pub tool_call_correctness: Score,
    /// Mean policy latency per agent turn
    pub router_latency_us: Score,
    /// Mean summed agent-turn latency per conversation
    pub overall_latency_us: Score,
    /// Percentage of conversations closed with a single trailing marker
    pub end_call_adherence: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryMetrics {
    /// Mean overlapping candidates per pair
    pub agent_overlap_score: Score,
    pub language_consistency_score: Score,
    /// Fraction in [0, 1]
    pub context_retention_score: Score,
    /// Name of the predicate that judged context retention
    pub context_predicate: String,
    /// Fraction in [0, 1]
    pub tool_efficiency_score: Score,
}

/// How the grade was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grading {
    pub thresholds: GradeThresholds,
    /// Metrics averaged into the grading score
    pub basis: Vec<String>,
    pub score: Score,
}

/// Findings derived from the metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub key_issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub policy_version: PolicyVersion,

    /// Conversations included in the metrics
    pub conversation_count: usize,

    /// Customer/agent pairs included in the metrics
    pub turn_count: usize,

    pub latency_unit: String,

    pub required_metrics: RequiredMetrics,

    pub supplementary_metrics: SupplementaryMetrics,

    pub grade: Grade,

    pub grading: Grading,

    pub analysis: Analysis,

    /// Conversations excluded because the policy failed on them
    #[serde(default)]
    pub warnings: Vec<SimulationWarning>,

    /// Full per-turn log
    pub conversations: Transcript,
}

impl Report {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// One-line summary for logs and terminals.
    pub fn summary(&self) -> String {
        format!(
            "{}: grade {} (score {}), routing {}%, END_CALL {}%, {} conversations, {} turns",
            self.policy_version,
            self.grade,
            self.grading.score,
            self.required_metrics.routing_accuracy,
            self.required_metrics.end_call_adherence,
            self.conversation_count,
            self.turn_count
        )
    }
}

//! Metrics engine.
//!
//! Scoring is a read-only reduction over a finished transcript. Pairs are
//! customer turns with the agent turn right after them; N is their count and
//! C the number of conversations. Rates with a zero denominator are
//! [`Score::Undefined`], never zero.

mod analysis;
pub mod context;
mod grade;
pub mod supplementary;

pub use analysis::analyze;
pub use context::{ContextPredicate, EntityReusePredicate};
pub use grade::{grading_score, Grade, GradeThresholds};

use tracing::info;

use crate::report::{
    Grading, Report, RequiredMetrics, Score, SupplementaryMetrics, LATENCY_UNIT,
};
use crate::runner::SimulationWarning;
use crate::tools::is_valid_call;
use crate::types::{AgentId, AgentTurn, Conversation, PolicyVersion, Speaker, Transcript};

/// Computes reports from transcripts.
pub struct MetricsEngine {
    thresholds: GradeThresholds,
    predicate: Box<dyn ContextPredicate>,
}

impl MetricsEngine {
    pub fn new(thresholds: GradeThresholds) -> Self {
        Self {
            thresholds,
            predicate: Box::new(EntityReusePredicate),
        }
    }

    /// Replace the context retention predicate.
    pub fn with_context_predicate(mut self, predicate: Box<dyn ContextPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn thresholds(&self) -> &GradeThresholds {
        &self.thresholds
    }

    pub fn predicate_name(&self) -> &str {
        self.predicate.name()
    }

    pub fn required(&self, transcript: &Transcript) -> RequiredMetrics {
        let conversations = transcript.conversations();
        let pairs: Vec<_> = conversations.iter().flat_map(Conversation::pairs).collect();
        let correct = pairs.iter().filter(|pair| pair.is_correctly_routed()).count();

        let calls: Vec<_> = pairs
            .iter()
            .flat_map(|pair| {
                pair.agent
                    .tool_calls
                    .iter()
                    .map(move |call| is_valid_call(pair.agent.actual_agent, call))
            })
            .collect();
        let tool_call_correctness = if calls.is_empty() && !pairs.is_empty() {
            Score::Value(100.0)
        } else {
            Score::percent(calls.iter().filter(|valid| **valid).count(), calls.len())
        };

        let agent_turns: Vec<&AgentTurn> =
            conversations.iter().flat_map(Conversation::agent_turns).collect();
        let turn_latency: u64 = agent_turns.iter().map(|turn| turn.latency_us()).sum();
        let conversation_latency: u64 = conversations.iter().map(Conversation::latency_us).sum();

        RequiredMetrics {
            routing_accuracy: Score::percent(correct, pairs.len()),
            misrouting_count: pairs.len() - correct,
            flow_adherence: Score::percent(
                conversations.iter().filter(|c| follows_flow(c)).count(),
                conversations.len(),
            ),
            tool_call_correctness,
            router_latency_us: Score::ratio(turn_latency as f64, agent_turns.len()),
            overall_latency_us: Score::ratio(conversation_latency as f64, conversations.len()),
            end_call_adherence: Score::percent(
                conversations.iter().filter(|c| ends_call_properly(c)).count(),
                conversations.len(),
            ),
        }
    }

    pub fn supplementary(&self, transcript: &Transcript) -> SupplementaryMetrics {
        SupplementaryMetrics {
            agent_overlap_score: supplementary::agent_overlap(transcript),
            language_consistency_score: supplementary::language_consistency(transcript),
            context_retention_score: supplementary::context_retention(
                transcript,
                self.predicate.as_ref(),
            ),
            context_predicate: self.predicate.name().to_string(),
            tool_efficiency_score: supplementary::tool_efficiency(transcript),
        }
    }

    /// Score a transcript into a full report.
    pub fn report(
        &self,
        policy_version: PolicyVersion,
        transcript: Transcript,
        warnings: Vec<SimulationWarning>,
    ) -> Report {
        let required = self.required(&transcript);
        let supplementary = self.supplementary(&transcript);

        let score = grading_score(required.routing_accuracy, required.end_call_adherence);
        let grade = self.thresholds.letter(score);
        let analysis = analyze(&required, &supplementary);

        info!(
            policy = %policy_version,
            conversations = transcript.conversations().len(),
            grade = %grade,
            "scored transcript"
        );

        Report {
            policy_version,
            conversation_count: transcript.conversations().len(),
            turn_count: transcript.pair_count(),
            latency_unit: LATENCY_UNIT.to_string(),
            required_metrics: required,
            supplementary_metrics: supplementary,
            grade,
            grading: Grading {
                thresholds: self.thresholds,
                basis: vec![
                    "routing_accuracy".to_string(),
                    "end_call_adherence".to_string(),
                ],
                score,
            },
            analysis,
            warnings,
            conversations: transcript,
        }
    }

    /// Recompute a report from its own per-turn log.
    pub fn rescore(&self, report: &Report) -> Report {
        self.report(
            report.policy_version,
            report.conversations.clone(),
            report.warnings.clone(),
        )
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(GradeThresholds::default())
    }
}

/// Starts with a customer turn, alternates strictly, ends with an agent
/// turn, and reaches Closer no earlier than the final agent turn.
pub fn follows_flow(conversation: &Conversation) -> bool {
    let turns = &conversation.turns;
    if turns.is_empty() {
        return false;
    }

    let alternates = turns.iter().enumerate().all(|(i, turn)| {
        let expected = if i % 2 == 0 {
            Speaker::Customer
        } else {
            Speaker::Agent
        };
        turn.speaker() == expected
    });
    if !alternates || turns.len() % 2 != 0 {
        return false;
    }

    let agents: Vec<&AgentTurn> = conversation.agent_turns().collect();
    let (_, before_final) = match agents.split_last() {
        Some(split) => split,
        None => return false,
    };
    !before_final
        .iter()
        .any(|turn| turn.actual_agent == Some(AgentId::Closer))
}

/// The final agent turn ends with the marker and no other turn carries it.
pub fn ends_call_properly(conversation: &Conversation) -> bool {
    let agents: Vec<&AgentTurn> = conversation.agent_turns().collect();
    match agents.split_last() {
        Some((last, before)) => {
            last.marker_is_final_token() && !before.iter().any(|turn| turn.contains_end_marker)
        }
        None => false,
    }
}

//! Key issues and recommendations derived from the metrics.
//!
//! Each finding fires on a fixed threshold. Undefined metrics never fire.

use crate::report::{Analysis, RequiredMetrics, Score, SupplementaryMetrics};

const ROUTING_FLOOR: f64 = 80.0;
const TOOL_CORRECTNESS_FLOOR: f64 = 90.0;
const END_CALL_FLOOR: f64 = 100.0;
const OVERLAP_CEILING: f64 = 0.3;
const LANGUAGE_FLOOR: f64 = 100.0;

fn below(score: Score, floor: f64) -> Option<f64> {
    score.value().filter(|v| *v < floor)
}

fn above(score: Score, ceiling: f64) -> Option<f64> {
    score.value().filter(|v| *v > ceiling)
}

pub fn analyze(required: &RequiredMetrics, supplementary: &SupplementaryMetrics) -> Analysis {
    let mut analysis = Analysis::default();

    if let Some(v) = below(required.routing_accuracy, ROUTING_FLOOR) {
        analysis.key_issues.push(format!(
            "Routing accuracy is {:.1}%, below {}%",
            v, ROUTING_FLOOR
        ));
        analysis.recommendations.push(
            "Give every agent a disjoint keyword set and ask for clarification instead of falling back to a default agent"
                .to_string(),
        );
    }

    if let Some(v) = below(required.tool_call_correctness, TOOL_CORRECTNESS_FLOOR) {
        analysis.key_issues.push(format!(
            "Tool call correctness is {:.1}%, below {}%",
            v, TOOL_CORRECTNESS_FLOOR
        ));
        analysis.recommendations.push(
            "Restrict each agent to its own tool catalog and collect every required parameter before calling"
                .to_string(),
        );
    }

    if let Some(v) = below(required.end_call_adherence, END_CALL_FLOOR) {
        analysis
            .key_issues
            .push(format!("END_CALL adherence is {:.1}%", v));
        analysis.recommendations.push(
            "Route farewells to Closer and emit the marker once, as the final token of its reply"
                .to_string(),
        );
    }

    if let Some(v) = above(supplementary.agent_overlap_score, OVERLAP_CEILING) {
        analysis.key_issues.push(format!(
            "Agent overlap score is {:.2}, above {}",
            v, OVERLAP_CEILING
        ));
        analysis
            .recommendations
            .push("Execute exactly one agent per customer turn".to_string());
    }

    if let Some(v) = below(supplementary.language_consistency_score, LANGUAGE_FLOOR) {
        analysis.key_issues.push(format!(
            "Language consistency is {:.1}%",
            v
        ));
        analysis.recommendations.push(
            "Detect the customer's language and reply in it".to_string(),
        );
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(routing: Score, tools: Score, end_call: Score) -> RequiredMetrics {
        RequiredMetrics {
            routing_accuracy: routing,
            misrouting_count: 0,
            flow_adherence: Score::Value(100.0),
            tool_call_correctness: tools,
            router_latency_us: Score::Value(1.0),
            overall_latency_us: Score::Value(1.0),
            end_call_adherence: end_call,
        }
    }

    fn supplementary(overlap: Score, language: Score) -> SupplementaryMetrics {
        SupplementaryMetrics {
            agent_overlap_score: overlap,
            language_consistency_score: language,
            context_retention_score: Score::Value(1.0),
            context_predicate: "entity_reuse".to_string(),
            tool_efficiency_score: Score::Value(1.0),
        }
    }

    #[test]
    fn test_clean_metrics_have_no_issues() {
        let analysis = analyze(
            &required(Score::Value(95.0), Score::Value(100.0), Score::Value(100.0)),
            &supplementary(Score::Value(0.0), Score::Value(100.0)),
        );
        assert!(analysis.key_issues.is_empty());
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_every_threshold_fires() {
        let analysis = analyze(
            &required(Score::Value(50.0), Score::Value(60.0), Score::Value(0.0)),
            &supplementary(Score::Value(0.5), Score::Value(40.0)),
        );
        assert_eq!(analysis.key_issues.len(), 5);
        assert_eq!(analysis.recommendations.len(), 5);
        assert!(analysis.key_issues[0].starts_with("Routing accuracy is 50.0%"));
    }

    #[test]
    fn test_undefined_metrics_never_fire() {
        let analysis = analyze(
            &required(Score::Undefined, Score::Undefined, Score::Undefined),
            &supplementary(Score::Undefined, Score::Undefined),
        );
        assert!(analysis.key_issues.is_empty());
    }
}

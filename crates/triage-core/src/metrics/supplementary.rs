//! Supplementary metrics: overlap, language, context retention and tool
//! efficiency.

use crate::report::Score;
use crate::tools::is_required_action;
use crate::types::{Conversation, ToolCall, Transcript, TurnPair};

use super::context::ContextPredicate;

/// Mean number of overlapping candidates per pair.
pub fn agent_overlap(transcript: &Transcript) -> Score {
    let pairs = all_pairs(transcript);
    let overlapping: usize = pairs
        .iter()
        .map(|pair| pair.agent.decision.overlapping_candidates().len())
        .sum();
    Score::ratio(overlapping as f64, pairs.len())
}

/// Percentage of pairs whose reply language is the customer's language.
pub fn language_consistency(transcript: &Transcript) -> Score {
    let pairs = all_pairs(transcript);
    let consistent = pairs
        .iter()
        .filter(|pair| pair.agent.reply_language == pair.customer.language)
        .count();
    Score::percent(consistent, pairs.len())
}

/// Fraction of agent turns after the first of each conversation that the
/// predicate finds consistent with earlier turns.
pub fn context_retention(transcript: &Transcript, predicate: &dyn ContextPredicate) -> Score {
    let mut eligible = 0;
    let mut consistent = 0;

    for conversation in transcript.conversations() {
        for (earlier, pair) in conversation.pairs_with_history().into_iter().skip(1) {
            eligible += 1;
            if predicate.is_consistent(earlier, pair) {
                consistent += 1;
            }
        }
    }

    Score::ratio(consistent as f64, eligible)
}

/// Fraction of tool calls that were both necessary and sufficient.
///
/// Necessary: the turn's intent requires the action, and it is the first
/// call of that action in the turn. Sufficient: no later turn repeats the
/// call with identical params, and a call carrying defaulted params is not
/// followed by another call of the same action at all.
pub fn tool_efficiency(transcript: &Transcript) -> Score {
    let mut calls = 0;
    let mut efficient = 0;

    for conversation in transcript.conversations() {
        let pairs = conversation.pairs();
        for (index, pair) in pairs.iter().enumerate() {
            let later = &pairs[index + 1..];
            for (position, call) in pair.agent.tool_calls.iter().enumerate() {
                calls += 1;
                if is_necessary(pair, position, call) && is_sufficient(later, call) {
                    efficient += 1;
                }
            }
        }
    }

    if calls == 0 {
        // No calls means no wasted calls.
        return if transcript.pair_count() > 0 {
            Score::Value(1.0)
        } else {
            Score::Undefined
        };
    }

    Score::ratio(efficient as f64, calls)
}

fn is_necessary(pair: &TurnPair<'_>, position: usize, call: &ToolCall) -> bool {
    let first_of_action = !pair.agent.tool_calls[..position]
        .iter()
        .any(|earlier| earlier.action == call.action);

    first_of_action
        && is_required_action(pair.customer.intent, pair.customer.expected_agent, &call.action)
}

fn is_sufficient(later: &[TurnPair<'_>], call: &ToolCall) -> bool {
    later
        .iter()
        .flat_map(|pair| pair.agent.tool_calls.iter())
        .filter(|other| other.action == call.action)
        .all(|other| !call.has_defaults() && other.params != call.params)
}

fn all_pairs(transcript: &Transcript) -> Vec<TurnPair<'_>> {
    transcript
        .conversations()
        .iter()
        .flat_map(Conversation::pairs)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::context::EntityReusePredicate;
    use crate::types::{
        AgentId, AgentTurn, CustomerTurn, Intent, Language, PolicyVersion, RoutingDecision, Turn,
    };

    fn customer(turn_id: u32, text: &str, language: Language, intent: Intent) -> Turn {
        Turn::Customer(CustomerTurn {
            turn_id,
            text: text.to_string(),
            language,
            expected_agent: AgentId::Search,
            intent,
        })
    }

    fn agent(turn_id: u32, language: Language, overlap: Vec<AgentId>, calls: Vec<ToolCall>) -> Turn {
        Turn::Agent(AgentTurn {
            turn_id,
            text: "ok".to_string(),
            actual_agent: Some(AgentId::Search),
            decision: RoutingDecision::Keyword {
                primary: AgentId::Search,
                overlapping_candidates: overlap,
            },
            reply_language: language,
            tool_calls: calls,
            contains_end_marker: false,
            clarification: vec![],
            timestamp_start_us: 0,
            timestamp_end_us: 0,
        })
    }

    fn transcript(turns: Vec<Turn>) -> Transcript {
        Transcript::new(vec![Conversation {
            conv_id: 1,
            policy_version: PolicyVersion::V0,
            scenario: "test".to_string(),
            turns,
        }])
    }

    fn refund(id: &str) -> ToolCall {
        ToolCall::new("refund_status").with_param("booking_id", id)
    }

    #[test]
    fn test_overlap_mean() {
        let t = transcript(vec![
            customer(1, "a", Language::English, Intent::Mixed),
            agent(2, Language::English, vec![AgentId::Booking, AgentId::Policy], vec![]),
            customer(3, "b", Language::English, Intent::Mixed),
            agent(4, Language::English, vec![], vec![]),
        ]);
        assert_eq!(agent_overlap(&t), Score::Value(1.0));
    }

    #[test]
    fn test_language_consistency() {
        let t = transcript(vec![
            customer(1, "Hola", Language::Spanish, Intent::Mixed),
            agent(2, Language::English, vec![], vec![]),
            customer(3, "Hello", Language::English, Intent::Mixed),
            agent(4, Language::English, vec![], vec![]),
        ]);
        assert_eq!(language_consistency(&t), Score::Value(50.0));
    }

    #[test]
    fn test_empty_transcript_is_undefined() {
        let t = Transcript::default();
        assert!(agent_overlap(&t).is_undefined());
        assert!(language_consistency(&t).is_undefined());
        assert!(context_retention(&t, &EntityReusePredicate).is_undefined());
        assert!(tool_efficiency(&t).is_undefined());
    }

    #[test]
    fn test_single_turn_context_is_undefined() {
        let t = transcript(vec![
            customer(1, "booking 456", Language::English, Intent::RefundStatus),
            agent(2, Language::English, vec![], vec![refund("456")]),
        ]);
        assert!(context_retention(&t, &EntityReusePredicate).is_undefined());
    }

    #[test]
    fn test_repeated_call_is_insufficient() {
        let t = transcript(vec![
            customer(1, "refund for 456", Language::English, Intent::RefundStatus),
            agent(2, Language::English, vec![], vec![refund("456")]),
            customer(3, "again, refund for 456", Language::English, Intent::RefundStatus),
            agent(4, Language::English, vec![], vec![refund("456")]),
        ]);
        // First call repeated later; second call stands.
        assert_eq!(tool_efficiency(&t), Score::Value(0.5));
    }

    #[test]
    fn test_defaulted_call_followed_up_is_insufficient() {
        let defaulted = ToolCall::new("refund_status").with_default("booking_id", "12345");
        let t = transcript(vec![
            customer(1, "refund status", Language::English, Intent::RefundStatus),
            agent(2, Language::English, vec![], vec![defaulted]),
            customer(3, "it's 456", Language::English, Intent::RefundStatus),
            agent(4, Language::English, vec![], vec![refund("456")]),
        ]);
        assert_eq!(tool_efficiency(&t), Score::Value(0.5));
    }

    #[test]
    fn test_unneeded_and_duplicate_calls_are_unnecessary() {
        let t = transcript(vec![
            customer(1, "baggage?", Language::English, Intent::BaggagePolicy),
            agent(2, Language::English, vec![], vec![refund("456")]),
            customer(3, "refund 789", Language::English, Intent::RefundStatus),
            agent(4, Language::English, vec![], vec![refund("789"), refund("789")]),
        ]);
        // Only the first refund_status of turn 4 counts.
        assert_eq!(tool_efficiency(&t), Score::ratio(1.0, 3));
    }

    #[test]
    fn test_no_calls_is_fully_efficient() {
        let t = transcript(vec![
            customer(1, "hello", Language::English, Intent::Mixed),
            agent(2, Language::English, vec![], vec![]),
        ]);
        assert_eq!(tool_efficiency(&t), Score::Value(1.0));
    }
}

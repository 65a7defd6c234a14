//! Routing policies.
//!
//! A policy turns one customer utterance, plus the conversation so far, into
//! an agent action: which specialist handles the turn, what it replies, and
//! which tools it invokes. Policies are pure functions of their inputs and
//! keep no state between calls.
//!
//! | Version | Behavior |
//! |---------|----------|
//! | **v0** | Flawed baseline: overlapping keywords, hard Search default, English only, defaulted params |
//! | **v1** | Corrected: disjoint keywords, language matching, clarification on missing slots |

pub mod keywords;
pub mod replies;
mod v0;
mod v1;

pub use v0::V0Policy;
pub use v1::V1Policy;

use thiserror::Error;

use crate::types::{
    AgentId, AgentTurn, Language, PolicyVersion, RoutingDecision, Slot, Speaker, ToolCall, Turn,
    END_CALL,
};

/// Errors a policy can return for malformed input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("history breaks customer/agent alternation at position {position}")]
    BrokenHistory { position: usize },

    #[error("history ends with an unanswered customer turn")]
    UnansweredTurn,
}

/// What the chosen agent does with a customer turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentAction {
    pub decision: RoutingDecision,
    pub reply: String,
    pub reply_language: Language,
    pub tool_calls: Vec<ToolCall>,
    /// Slots the reply asks the customer for
    pub clarification: Vec<Slot>,
}

impl AgentAction {
    pub fn agent(&self) -> Option<AgentId> {
        self.decision.agent()
    }

    pub fn contains_end_marker(&self) -> bool {
        self.reply.contains(END_CALL)
    }
}

/// A versioned rule table mapping customer utterances to agent actions.
pub trait RoutingPolicy: Send + Sync {
    fn version(&self) -> PolicyVersion;

    /// Decide the agent action for `utterance`.
    ///
    /// `history` holds the turns that precede the utterance. Only utterance
    /// text and earlier agent output are read; ground-truth labels on
    /// customer turns are never consulted.
    fn decide(&self, history: &[Turn], utterance: &str) -> Result<AgentAction, PolicyError>;
}

/// Select the policy implementation for a version.
pub fn policy_for(version: PolicyVersion) -> Box<dyn RoutingPolicy> {
    match version {
        PolicyVersion::V0 => Box::new(V0Policy::new()),
        PolicyVersion::V1 => Box::new(V1Policy::new()),
    }
}

/// Check that history alternates customer/agent, starting with a customer
/// turn and ending with an agent turn.
pub fn validate_history(history: &[Turn]) -> Result<(), PolicyError> {
    for (position, turn) in history.iter().enumerate() {
        let expected = if position % 2 == 0 {
            Speaker::Customer
        } else {
            Speaker::Agent
        };
        if turn.speaker() != expected {
            return Err(PolicyError::BrokenHistory { position });
        }
    }

    if history.len() % 2 == 1 {
        return Err(PolicyError::UnansweredTurn);
    }

    Ok(())
}

fn last_agent_turn(history: &[Turn]) -> Option<&AgentTurn> {
    history.iter().rev().find_map(Turn::as_agent)
}

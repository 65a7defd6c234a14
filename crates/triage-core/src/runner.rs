//! Simulation runner: plays scripted customer utterances against a policy.
//!
//! Each customer utterance is handed to the policy together with every turn
//! that precedes it. The clock is read immediately before and after the
//! policy call; the difference is the turn's latency.
//!
//! Conversations are independent of each other. A policy failure aborts only
//! the conversation it happened in, which is dropped from the transcript and
//! reported as a [`SimulationWarning`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::policy::{policy_for, PolicyError, RoutingPolicy};
use crate::source::ConversationScript;
use crate::types::{AgentTurn, Conversation, CustomerTurn, PolicyVersion, Transcript, Turn};

/// Which clock timestamps agent turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClockConfig {
    /// Real elapsed time since the conversation started
    #[default]
    Monotonic,
    /// Every reading advances by `step_us`, so latencies are reproducible
    FixedStep { step_us: u64 },
}

impl ClockConfig {
    /// A fresh clock starting at zero.
    pub fn build(&self) -> Box<dyn Clock> {
        match *self {
            ClockConfig::Monotonic => Box::new(MonotonicClock::new()),
            ClockConfig::FixedStep { step_us } => Box::new(FixedStepClock::new(step_us)),
        }
    }
}

/// Source of turn timestamps, in microseconds.
pub trait Clock: Send {
    fn now_us(&mut self) -> u64;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Returns 0, step, 2*step, ... on successive readings.
pub struct FixedStepClock {
    step_us: u64,
    next_us: u64,
}

impl FixedStepClock {
    pub fn new(step_us: u64) -> Self {
        Self {
            step_us,
            next_us: 0,
        }
    }
}

impl Clock for FixedStepClock {
    fn now_us(&mut self) -> u64 {
        let now = self.next_us;
        self.next_us = self.next_us.saturating_add(self.step_us);
        now
    }
}

/// A policy failure that aborted one conversation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("conversation {conv_id} aborted at turn {turn_id}: {source}")]
pub struct SimulationError {
    pub conv_id: u32,
    pub turn_id: u32,
    pub source: PolicyError,
}

/// A conversation excluded from the run, as stated in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationWarning {
    pub conv_id: u32,
    pub turn_id: u32,
    pub message: String,
}

impl From<&SimulationError> for SimulationWarning {
    fn from(error: &SimulationError) -> Self {
        Self {
            conv_id: error.conv_id,
            turn_id: error.turn_id,
            message: error.source.to_string(),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationOutcome {
    pub transcript: Transcript,
    pub warnings: Vec<SimulationWarning>,
}

/// Runs scripts through one policy.
#[derive(Clone)]
pub struct SimulationRunner {
    policy: Arc<dyn RoutingPolicy>,
    clock: ClockConfig,
}

impl SimulationRunner {
    pub fn new(policy: Arc<dyn RoutingPolicy>, clock: ClockConfig) -> Self {
        Self { policy, clock }
    }

    /// A runner for one of the built-in policies.
    pub fn for_version(version: PolicyVersion, clock: ClockConfig) -> Self {
        Self::new(Arc::from(policy_for(version)), clock)
    }

    pub fn policy_version(&self) -> PolicyVersion {
        self.policy.version()
    }

    /// Simulate one conversation.
    pub fn simulate(&self, script: &ConversationScript) -> Result<Conversation, SimulationError> {
        let mut clock = self.clock.build();
        let mut turns: Vec<Turn> = Vec::with_capacity(script.utterances.len() * 2);

        for utterance in &script.utterances {
            let turn_id = turns.len() as u32 + 1;

            let start = clock.now_us();
            let action = self
                .policy
                .decide(&turns, &utterance.text)
                .map_err(|source| SimulationError {
                    conv_id: script.conv_id,
                    turn_id,
                    source,
                })?;
            let end = clock.now_us();

            let actual_agent = action.agent();
            let contains_end_marker = action.contains_end_marker();

            debug!(
                conv_id = script.conv_id,
                turn_id,
                expected = %utterance.expected_agent,
                actual = ?actual_agent,
                latency_us = end.saturating_sub(start),
                "simulated turn"
            );

            turns.push(Turn::Customer(CustomerTurn {
                turn_id,
                text: utterance.text.clone(),
                language: utterance.language,
                expected_agent: utterance.expected_agent,
                intent: utterance.intent,
            }));
            turns.push(Turn::Agent(AgentTurn {
                turn_id: turn_id + 1,
                text: action.reply,
                actual_agent,
                decision: action.decision,
                reply_language: action.reply_language,
                tool_calls: action.tool_calls,
                contains_end_marker,
                clarification: action.clarification,
                timestamp_start_us: start,
                timestamp_end_us: end,
            }));
        }

        Ok(Conversation {
            conv_id: script.conv_id,
            policy_version: self.policy.version(),
            scenario: script.scenario.clone(),
            turns,
        })
    }

    /// Simulate every script in order, excluding failed conversations.
    pub fn run(&self, scripts: &[ConversationScript]) -> SimulationOutcome {
        let mut outcome = SimulationOutcome::default();
        let mut conversations = Vec::with_capacity(scripts.len());

        for script in scripts {
            match self.simulate(script) {
                Ok(conversation) => conversations.push(conversation),
                Err(error) => {
                    warn!(conv_id = error.conv_id, turn_id = error.turn_id, %error, "conversation excluded");
                    outcome.warnings.push(SimulationWarning::from(&error));
                }
            }
        }

        info!(
            policy = %self.policy.version(),
            simulated = conversations.len(),
            excluded = outcome.warnings.len(),
            "simulation finished"
        );

        outcome.transcript = Transcript::new(conversations);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AgentAction;
    use crate::source::CustomerUtterance;
    use crate::types::{AgentId, Intent, Language, RoutingDecision};

    fn utterance(text: &str, expected_agent: AgentId, intent: Intent) -> CustomerUtterance {
        CustomerUtterance {
            text: text.to_string(),
            language: Language::English,
            expected_agent,
            intent,
        }
    }

    fn luggage_script(conv_id: u32) -> ConversationScript {
        ConversationScript {
            conv_id,
            scenario: "baggage_policy".to_string(),
            utterances: vec![
                utterance("How much luggage can I carry?", AgentId::Policy, Intent::BaggagePolicy),
                utterance(
                    "What's my refund status for booking 789?",
                    AgentId::Search,
                    Intent::RefundStatus,
                ),
                utterance("goodbye", AgentId::Closer, Intent::Farewell),
            ],
        }
    }

    /// Fails on any utterance mentioning "explode".
    struct FailingPolicy;

    impl RoutingPolicy for FailingPolicy {
        fn version(&self) -> PolicyVersion {
            PolicyVersion::V1
        }

        fn decide(&self, history: &[Turn], utterance: &str) -> Result<AgentAction, PolicyError> {
            if utterance.contains("explode") {
                return Err(PolicyError::BrokenHistory {
                    position: history.len(),
                });
            }
            Ok(AgentAction {
                decision: RoutingDecision::Default {
                    agent: AgentId::Search,
                },
                reply: "ok".to_string(),
                reply_language: Language::English,
                tool_calls: vec![],
                clarification: vec![],
            })
        }
    }

    #[test]
    fn test_fixed_step_clock() {
        let mut clock = FixedStepClock::new(25);
        assert_eq!(clock.now_us(), 0);
        assert_eq!(clock.now_us(), 25);
        assert_eq!(clock.now_us(), 50);
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let mut clock = MonotonicClock::new();
        let first = clock.now_us();
        assert!(clock.now_us() >= first);
    }

    #[test]
    fn test_turn_ids_and_timestamps() {
        let runner = SimulationRunner::for_version(
            PolicyVersion::V1,
            ClockConfig::FixedStep { step_us: 10 },
        );
        let conversation = runner.simulate(&luggage_script(1)).unwrap();

        let ids: Vec<u32> = conversation.turns.iter().map(Turn::turn_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

        let agents: Vec<&AgentTurn> = conversation.agent_turns().collect();
        assert_eq!(agents[0].timestamp_start_us, 0);
        assert_eq!(agents[0].timestamp_end_us, 10);
        assert_eq!(agents[1].timestamp_start_us, 20);
        assert!(agents.iter().all(|t| t.latency_us() == 10));
        assert_eq!(conversation.latency_us(), 30);
    }

    #[test]
    fn test_v1_routes_example_conversation() {
        let runner = SimulationRunner::for_version(PolicyVersion::V1, ClockConfig::default());
        let conversation = runner.simulate(&luggage_script(1)).unwrap();

        let agents: Vec<Option<AgentId>> =
            conversation.agent_turns().map(|t| t.actual_agent).collect();
        assert_eq!(
            agents,
            vec![Some(AgentId::Policy), Some(AgentId::Search), Some(AgentId::Closer)]
        );
        assert_eq!(conversation.policy_version, PolicyVersion::V1);
    }

    #[test]
    fn test_failed_conversation_is_excluded() {
        let runner = SimulationRunner::new(
            Arc::new(FailingPolicy),
            ClockConfig::FixedStep { step_us: 1 },
        );

        let mut broken = luggage_script(2);
        broken.utterances[1].text = "this will explode".to_string();

        let outcome = runner.run(&[luggage_script(1), broken, luggage_script(3)]);

        let ids: Vec<u32> = outcome
            .transcript
            .conversations()
            .iter()
            .map(|c| c.conv_id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].conv_id, 2);
        assert_eq!(outcome.warnings[0].turn_id, 3);
    }

    #[test]
    fn test_clock_config_serde() {
        let clock: ClockConfig =
            serde_json::from_str(r#"{"kind": "fixed_step", "step_us": 5}"#).unwrap();
        assert_eq!(clock, ClockConfig::FixedStep { step_us: 5 });

        let clock: ClockConfig = serde_json::from_str(r#"{"kind": "monotonic"}"#).unwrap();
        assert_eq!(clock, ClockConfig::Monotonic);
    }
}

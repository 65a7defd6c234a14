//! Core types for triage evaluation.
//!
//! These types are shared by the policy engine, the simulation runner and the
//! metrics engine. Everything here serializes to the per-turn log carried by
//! a [`Report`](crate::Report), and deserializes back from it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Sentinel token marking proper conversation termination.
pub const END_CALL: &str = "<END_CALL>";

/// The domain specialists a customer utterance can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentId {
    Search,
    Policy,
    Complaint,
    Booking,
    Closer,
}

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Search => "Search",
            AgentId::Policy => "Policy",
            AgentId::Complaint => "Complaint",
            AgentId::Booking => "Booking",
            AgentId::Closer => "Closer",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Languages a customer may speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Spanish,
    French,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::English, Language::Spanish, Language::French];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "spanish",
            Language::French => "french",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "spanish" | "es" => Ok(Language::Spanish),
            "french" | "fr" => Ok(Language::French),
            other => Err(ConfigError::Invalid(format!("unknown language: {}", other))),
        }
    }
}

/// Which rule table produced the agent turns of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyVersion {
    /// Deliberately flawed baseline.
    #[serde(rename = "v0")]
    V0,
    /// Corrected rule table.
    #[serde(rename = "v1")]
    V1,
}

impl PolicyVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyVersion::V0 => "v0",
            PolicyVersion::V1 => "v1",
        }
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v0" => Ok(PolicyVersion::V0),
            "v1" => Ok(PolicyVersion::V1),
            other => Err(ConfigError::UnknownPolicyVersion(other.to_string())),
        }
    }
}

/// Ground-truth intent category of a customer utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    RefundStatus,
    RefundPolicy,
    FlightSearch,
    BaggagePolicy,
    Complaint,
    BookingDetails,
    Mixed,
    Farewell,
}

/// A piece of information a reply asks the customer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    BookingId,
    Origin,
    Destination,
    Date,
    Field,
    Value,
    /// The request itself was not understood.
    Intent,
}

/// A tool invocation emitted by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    pub action: String,

    pub params: BTreeMap<String, String>,

    /// Params filled with hardcoded defaults instead of customer input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaulted: Vec<String>,
}

impl ToolCall {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: BTreeMap::new(),
            defaulted: Vec::new(),
        }
    }

    /// Add a param taken from the conversation.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a param filled with a hardcoded default.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.defaulted.push(key.clone());
        self.params.insert(key, value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn has_defaults(&self) -> bool {
        !self.defaulted.is_empty()
    }
}

/// How the policy picked the agent for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// A keyword category matched. Further matched categories are recorded
    /// but never executed.
    Keyword {
        primary: AgentId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        overlapping_candidates: Vec<AgentId>,
    },
    /// Nothing matched and the policy fell back to a hard default.
    Default { agent: AgentId },
    /// Nothing matched and the agent was carried over from earlier turns.
    Context { agent: AgentId },
    /// Nothing matched and no agent could be inferred.
    NoConfidentMatch,
}

impl RoutingDecision {
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            RoutingDecision::Keyword { primary, .. } => Some(*primary),
            RoutingDecision::Default { agent } | RoutingDecision::Context { agent } => Some(*agent),
            RoutingDecision::NoConfidentMatch => None,
        }
    }

    pub fn overlapping_candidates(&self) -> &[AgentId] {
        match self {
            RoutingDecision::Keyword {
                overlapping_candidates,
                ..
            } => overlapping_candidates,
            _ => &[],
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Customer,
    Agent,
}

/// A customer utterance with its ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerTurn {
    pub turn_id: u32,
    pub text: String,
    /// The customer's actual language.
    pub language: Language,
    pub expected_agent: AgentId,
    pub intent: Intent,
}

/// The agent reply produced by one policy engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTurn {
    pub turn_id: u32,

    /// Reply text.
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_agent: Option<AgentId>,

    pub decision: RoutingDecision,

    pub reply_language: Language,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    pub contains_end_marker: bool,

    /// Slots this reply asks the customer for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clarification: Vec<Slot>,

    pub timestamp_start_us: u64,
    pub timestamp_end_us: u64,
}

impl AgentTurn {
    /// Time spent inside the policy engine for this turn.
    pub fn latency_us(&self) -> u64 {
        self.timestamp_end_us.saturating_sub(self.timestamp_start_us)
    }

    /// True when the END_CALL marker is the last token of the reply.
    pub fn marker_is_final_token(&self) -> bool {
        self.contains_end_marker && self.text.trim_end().ends_with(END_CALL)
    }

    pub fn asks_for(&self, slot: Slot) -> bool {
        self.clarification.contains(&slot)
    }
}

/// One utterance exchange unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "speaker", rename_all = "snake_case")]
pub enum Turn {
    Customer(CustomerTurn),
    Agent(AgentTurn),
}

impl Turn {
    pub fn turn_id(&self) -> u32 {
        match self {
            Turn::Customer(t) => t.turn_id,
            Turn::Agent(t) => t.turn_id,
        }
    }

    pub fn speaker(&self) -> Speaker {
        match self {
            Turn::Customer(_) => Speaker::Customer,
            Turn::Agent(_) => Speaker::Agent,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Turn::Customer(t) => &t.text,
            Turn::Agent(t) => &t.text,
        }
    }

    pub fn as_customer(&self) -> Option<&CustomerTurn> {
        match self {
            Turn::Customer(t) => Some(t),
            Turn::Agent(_) => None,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentTurn> {
        match self {
            Turn::Agent(t) => Some(t),
            Turn::Customer(_) => None,
        }
    }
}

/// A customer turn and the agent turn that answered it.
#[derive(Debug, Clone, Copy)]
pub struct TurnPair<'a> {
    pub customer: &'a CustomerTurn,
    pub agent: &'a AgentTurn,
}

impl TurnPair<'_> {
    pub fn is_correctly_routed(&self) -> bool {
        self.agent.actual_agent == Some(self.customer.expected_agent)
    }
}

/// A simulated conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conv_id: u32,
    pub policy_version: PolicyVersion,
    pub scenario: String,
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Every customer turn immediately followed by an agent turn.
    pub fn pairs(&self) -> Vec<TurnPair<'_>> {
        self.pairs_with_history()
            .into_iter()
            .map(|(_, pair)| pair)
            .collect()
    }

    /// Every pair, together with the turns preceding its customer turn.
    pub fn pairs_with_history(&self) -> Vec<(&[Turn], TurnPair<'_>)> {
        let mut pairs = Vec::new();
        let mut i = 0;
        while i + 1 < self.turns.len() {
            if let (Turn::Customer(customer), Turn::Agent(agent)) = (&self.turns[i], &self.turns[i + 1]) {
                pairs.push((&self.turns[..i], TurnPair { customer, agent }));
                i += 2;
            } else {
                i += 1;
            }
        }
        pairs
    }

    pub fn agent_turns(&self) -> impl Iterator<Item = &AgentTurn> {
        self.turns.iter().filter_map(Turn::as_agent)
    }

    /// Sum of the agent turn latencies.
    pub fn latency_us(&self) -> u64 {
        self.agent_turns().map(AgentTurn::latency_us).sum()
    }
}

/// Immutable record of a simulated run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    conversations: Vec<Conversation>,
}

impl Transcript {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.conversations.iter().map(|c| c.pairs().len()).sum()
    }
}

impl From<Vec<Conversation>> for Transcript {
    fn from(conversations: Vec<Conversation>) -> Self {
        Self::new(conversations)
    }
}

//! v0 routing policy: the flawed baseline.
//!
//! Reproduces the defects the evaluation exists to measure:
//! - baggage and luggage route to Search
//! - unmatched utterances fall back to Search
//! - every further matched category is an overlapping candidate whose tool
//!   calls are emitted alongside the primary's
//! - replies are always English
//! - missing params are filled with hardcoded defaults
//! - goodbye keywords make the current agent emit the marker at the start of
//!   its reply; Closer is never routed to

use tracing::trace;

use crate::types::{AgentId, Language, PolicyVersion, RoutingDecision, ToolCall, Turn, END_CALL};

use super::keywords::{booking_refs, contains_any, matched_agents, V0_CATEGORIES, V0_GOODBYE};
use super::{validate_history, AgentAction, PolicyError, RoutingPolicy};

const DEFAULT_BOOKING_ID: &str = "12345";
const CLOSING: &str = "Thank you for contacting us. Have a great day!";

/// The flawed baseline policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct V0Policy;

impl V0Policy {
    pub fn new() -> Self {
        Self
    }
}

impl RoutingPolicy for V0Policy {
    fn version(&self) -> PolicyVersion {
        PolicyVersion::V0
    }

    fn decide(&self, history: &[Turn], utterance: &str) -> Result<AgentAction, PolicyError> {
        validate_history(history)?;

        let lowered = utterance.to_lowercase();
        let matched = matched_agents(&lowered, V0_CATEGORIES);

        let (primary, decision) = match matched.split_first() {
            Some((primary, rest)) => (
                *primary,
                RoutingDecision::Keyword {
                    primary: *primary,
                    overlapping_candidates: rest.to_vec(),
                },
            ),
            None => (
                AgentId::Search,
                RoutingDecision::Default {
                    agent: AgentId::Search,
                },
            ),
        };

        let (mut reply, mut tool_calls) = respond(primary, utterance, &lowered);
        for candidate in decision.overlapping_candidates() {
            let (_, calls) = respond(*candidate, utterance, &lowered);
            tool_calls.extend(calls);
        }

        if contains_any(&lowered, V0_GOODBYE) {
            reply = format!("{} {}", END_CALL, CLOSING);
        }

        trace!(
            agent = %primary,
            overlap = decision.overlapping_candidates().len(),
            calls = tool_calls.len(),
            "v0 decision"
        );

        Ok(AgentAction {
            decision,
            reply,
            reply_language: Language::English,
            tool_calls,
            clarification: Vec::new(),
        })
    }
}

fn respond(agent: AgentId, utterance: &str, lowered: &str) -> (String, Vec<ToolCall>) {
    match agent {
        AgentId::Search => search(utterance, lowered),
        AgentId::Policy => policy(utterance, lowered),
        AgentId::Complaint => complaint(utterance, lowered),
        AgentId::Booking => booking(lowered),
        AgentId::Closer => (CLOSING.to_string(), Vec::new()),
    }
}

/// First booking reference in the utterance, or the hardcoded default.
fn refund_status_call(utterance: &str) -> (String, ToolCall) {
    let call = ToolCall::new("refund_status");
    match booking_refs(utterance).into_iter().next() {
        Some(booking_id) => (booking_id.clone(), call.with_param("booking_id", booking_id)),
        None => (
            DEFAULT_BOOKING_ID.to_string(),
            call.with_default("booking_id", DEFAULT_BOOKING_ID),
        ),
    }
}

fn search(utterance: &str, lowered: &str) -> (String, Vec<ToolCall>) {
    if contains_any(lowered, &["refund status", "booking id"]) {
        let (booking_id, call) = refund_status_call(utterance);
        (
            format!("I'll check the refund status for booking ID {}.", booking_id),
            vec![call],
        )
    } else if contains_any(lowered, &["search", "find", "flight"]) {
        let call = ToolCall::new("search_flights")
            .with_default("origin", "BLR")
            .with_default("destination", "DEL")
            .with_default("date", "today")
            .with_default("class", "economy");
        (
            "I'll search for flights with the default parameters.".to_string(),
            vec![call],
        )
    } else if lowered.contains("refund policy") {
        (
            "Refunds are processed within 5-7 business days.".to_string(),
            Vec::new(),
        )
    } else {
        (
            "I can help you with flight searches and refund status. What would you like to know?"
                .to_string(),
            Vec::new(),
        )
    }
}

fn policy(utterance: &str, lowered: &str) -> (String, Vec<ToolCall>) {
    if contains_any(lowered, &["baggage", "allowance"]) {
        (
            "Domestic flights allow 15kg check-in and 7kg cabin baggage. International flights allow 23kg check-in and 7kg cabin baggage."
                .to_string(),
            Vec::new(),
        )
    } else if lowered.contains("refund policy") {
        (
            "Refunds are processed within 5-7 business days. Processing fees may apply.".to_string(),
            Vec::new(),
        )
    } else if lowered.contains("refund status") {
        // refund_status is not in Policy's catalog
        let (booking_id, call) = refund_status_call(utterance);
        (
            format!("I'll check the refund status for booking ID {}.", booking_id),
            vec![call],
        )
    } else if lowered.contains("booking") {
        let call = ToolCall::new("check_booking").with_default("booking_id", DEFAULT_BOOKING_ID);
        ("I'll check your booking details directly.".to_string(), vec![call])
    } else {
        (
            "I can help you with policies and refund information. What would you like to know?"
                .to_string(),
            Vec::new(),
        )
    }
}

fn complaint(utterance: &str, lowered: &str) -> (String, Vec<ToolCall>) {
    let filed = |kind: &str| {
        ToolCall::new("file_complaint")
            .with_param("type", kind)
            .with_param("description", utterance)
    };

    if contains_any(lowered, &["damage", "luggage"]) {
        (
            "I'm sorry to hear about the luggage damage. I'll file a complaint for you.".to_string(),
            vec![filed("luggage_damage")],
        )
    } else if contains_any(lowered, &["complaint", "problem", "issue", "bad"]) {
        (
            "I understand your concern. I'll file a complaint and have someone follow up with you."
                .to_string(),
            vec![filed("general")],
        )
    } else if lowered.contains("refund") {
        (
            "I can help you with refund status. Let me check that for you.".to_string(),
            Vec::new(),
        )
    } else {
        (
            "I'm here to help with complaints and issues. Please tell me what happened.".to_string(),
            Vec::new(),
        )
    }
}

fn booking(lowered: &str) -> (String, Vec<ToolCall>) {
    if contains_any(lowered, &["passenger", "details", "name", "contact"]) {
        let call =
            ToolCall::new("get_passenger_details").with_default("booking_id", DEFAULT_BOOKING_ID);
        (
            "I'll retrieve the passenger details for your booking.".to_string(),
            vec![call],
        )
    } else if lowered.contains("confirm") {
        let call = ToolCall::new("confirm_booking").with_default("booking_id", DEFAULT_BOOKING_ID);
        ("I'll confirm your booking details.".to_string(), vec![call])
    } else if contains_any(lowered, &["available", "availability"]) {
        // check_availability belongs to Search
        let call = ToolCall::new("check_availability")
            .with_default("route", "BLR-DEL")
            .with_default("date", "today");
        ("I'll check flight availability for you.".to_string(), vec![call])
    } else {
        (
            "I can help you with booking details and confirmations. What do you need?".to_string(),
            Vec::new(),
        )
    }
}

//! Tool catalog: which actions each agent may invoke, and the params each
//! action requires.

use crate::types::{AgentId, Intent, ToolCall};

/// One entry of the tool catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub agent: AgentId,
    pub action: &'static str,
    pub required: &'static [&'static str],
}

pub static TOOL_CATALOG: &[ToolSpec] = &[
    ToolSpec {
        agent: AgentId::Search,
        action: "search_flights",
        required: &["origin", "destination", "date"],
    },
    ToolSpec {
        agent: AgentId::Search,
        action: "refund_status",
        required: &["booking_id"],
    },
    ToolSpec {
        agent: AgentId::Search,
        action: "check_availability",
        required: &["route", "date"],
    },
    ToolSpec {
        agent: AgentId::Policy,
        action: "get_policy",
        required: &["type"],
    },
    ToolSpec {
        agent: AgentId::Policy,
        action: "check_terms",
        required: &["category"],
    },
    ToolSpec {
        agent: AgentId::Complaint,
        action: "file_complaint",
        required: &["type", "description"],
    },
    ToolSpec {
        agent: AgentId::Complaint,
        action: "escalate_issue",
        required: &["priority", "category"],
    },
    ToolSpec {
        agent: AgentId::Booking,
        action: "get_booking_details",
        required: &["booking_id"],
    },
    ToolSpec {
        agent: AgentId::Booking,
        action: "get_passenger_details",
        required: &["booking_id"],
    },
    ToolSpec {
        agent: AgentId::Booking,
        action: "update_passenger",
        required: &["booking_id", "field", "value"],
    },
    ToolSpec {
        agent: AgentId::Booking,
        action: "confirm_booking",
        required: &["booking_id"],
    },
];

/// Look up an action in an agent's catalog.
pub fn spec_for(agent: AgentId, action: &str) -> Option<&'static ToolSpec> {
    TOOL_CATALOG
        .iter()
        .find(|spec| spec.agent == agent && spec.action == action)
}

pub fn actions_for(agent: AgentId) -> impl Iterator<Item = &'static str> {
    TOOL_CATALOG
        .iter()
        .filter(move |spec| spec.agent == agent)
        .map(|spec| spec.action)
}

/// A call is valid when the issuing agent's catalog lists the action and
/// every required param is present and non-empty.
pub fn is_valid_call(agent: Option<AgentId>, call: &ToolCall) -> bool {
    let Some(spec) = agent.and_then(|agent| spec_for(agent, &call.action)) else {
        return false;
    };

    spec.required
        .iter()
        .all(|param| call.param(param).is_some_and(|value| !value.trim().is_empty()))
}

/// Whether a turn with this intent needs the action at all.
pub fn is_required_action(intent: Intent, expected_agent: AgentId, action: &str) -> bool {
    match intent {
        Intent::RefundStatus => action == "refund_status",
        Intent::FlightSearch => matches!(action, "search_flights" | "check_availability"),
        Intent::Complaint => matches!(action, "file_complaint" | "escalate_issue"),
        Intent::BookingDetails => actions_for(AgentId::Booking).any(|a| a == action),
        Intent::Mixed => actions_for(expected_agent).any(|a| a == action),
        Intent::RefundPolicy | Intent::BaggagePolicy | Intent::Farewell => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closer_has_no_tools() {
        assert_eq!(actions_for(AgentId::Closer).count(), 0);
    }

    #[test]
    fn test_valid_call_needs_catalog_entry() {
        let call = ToolCall::new("refund_status").with_param("booking_id", "789");
        assert!(is_valid_call(Some(AgentId::Search), &call));
        assert!(!is_valid_call(Some(AgentId::Policy), &call));
        assert!(!is_valid_call(None, &call));
    }

    #[test]
    fn test_valid_call_needs_required_params() {
        let call = ToolCall::new("search_flights")
            .with_param("origin", "BLR")
            .with_param("destination", "");
        assert!(!is_valid_call(Some(AgentId::Search), &call));

        let call = call.with_param("destination", "DEL").with_param("date", "today");
        assert!(is_valid_call(Some(AgentId::Search), &call));
    }

    #[test]
    fn test_unknown_action_is_invalid() {
        let call = ToolCall::new("check_booking").with_default("booking_id", "12345");
        assert!(!is_valid_call(Some(AgentId::Policy), &call));
        assert!(!is_valid_call(Some(AgentId::Booking), &call));
    }

    #[test]
    fn test_required_actions_by_intent() {
        assert!(is_required_action(Intent::RefundStatus, AgentId::Search, "refund_status"));
        assert!(!is_required_action(Intent::BaggagePolicy, AgentId::Policy, "get_policy"));
        assert!(is_required_action(Intent::BookingDetails, AgentId::Booking, "confirm_booking"));
        assert!(is_required_action(Intent::Mixed, AgentId::Search, "search_flights"));
        assert!(!is_required_action(Intent::Mixed, AgentId::Search, "file_complaint"));
    }
}

//! v1 routing policy: the corrected rule table.
//!
//! - keyword categories are disjoint and only the first match is executed
//! - unmatched utterances stay with the agent already handling the
//!   conversation, or get a clarification request when there is none
//! - replies follow the customer's language
//! - at most one tool call per turn, never with invented params
//! - only Closer emits the marker, as the final token of its reply, and
//!   only once per conversation

use tracing::trace;

use crate::types::{
    AgentId, Language, PolicyVersion, RoutingDecision, Slot, ToolCall, Turn, END_CALL,
};

use super::keywords::{
    self, booking_refs, contains_any, contains_word, detect_language, travel_date,
    V1_CATEGORIES,
};
use super::replies::{clarification, phrase, render, Phrase};
use super::{last_agent_turn, validate_history, AgentAction, PolicyError, RoutingPolicy};

/// The corrected policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct V1Policy;

impl V1Policy {
    pub fn new() -> Self {
        Self
    }
}

impl RoutingPolicy for V1Policy {
    fn version(&self) -> PolicyVersion {
        PolicyVersion::V1
    }

    fn decide(&self, history: &[Turn], utterance: &str) -> Result<AgentAction, PolicyError> {
        validate_history(history)?;

        let language = reply_language(history, utterance);
        let decision = route(history, &utterance.to_lowercase());

        let Some(agent) = decision.agent() else {
            trace!(language = %language, "v1 no confident match");
            return Ok(AgentAction {
                decision,
                reply: phrase(Phrase::NoMatch, language).to_string(),
                reply_language: language,
                tool_calls: Vec::new(),
                clarification: vec![Slot::Intent],
            });
        };

        let request = Request::new(history, utterance, agent);
        let response = match agent {
            AgentId::Search => search(&request, language),
            AgentId::Policy => policy(&request, language),
            AgentId::Complaint => complaint(&request, language),
            AgentId::Booking => booking(&request, language),
            AgentId::Closer => closer(history, language),
        };

        trace!(
            agent = %agent,
            language = %language,
            follow_up = request.follow_up,
            call = response.call.as_ref().map(|c| c.action.as_str()),
            "v1 decision"
        );

        Ok(AgentAction {
            decision,
            reply: response.reply,
            reply_language: language,
            tool_calls: response.call.into_iter().collect(),
            clarification: response.missing,
        })
    }
}

fn route(history: &[Turn], lowered: &str) -> RoutingDecision {
    if let Some(category) = V1_CATEGORIES.iter().find(|c| c.matches(lowered)) {
        return RoutingDecision::Keyword {
            primary: category.agent,
            overlapping_candidates: Vec::new(),
        };
    }

    let carried = history
        .iter()
        .rev()
        .filter_map(Turn::as_agent)
        .filter_map(|turn| turn.actual_agent)
        .find(|agent| *agent != AgentId::Closer);

    match carried {
        Some(agent) => RoutingDecision::Context { agent },
        None => RoutingDecision::NoConfidentMatch,
    }
}

fn reply_language(history: &[Turn], utterance: &str) -> Language {
    detect_language(utterance)
        .or_else(|| dominant_language(history))
        .unwrap_or(Language::English)
}

/// Most frequent reply language of earlier agent turns; ties go to the
/// language seen first.
fn dominant_language(history: &[Turn]) -> Option<Language> {
    let mut counts: Vec<(Language, usize)> = Vec::new();
    for turn in history.iter().filter_map(Turn::as_agent) {
        match counts.iter_mut().find(|(l, _)| *l == turn.reply_language) {
            Some((_, count)) => *count += 1,
            None => counts.push((turn.reply_language, 1)),
        }
    }

    counts
        .into_iter()
        .fold(None, |best: Option<(Language, usize)>, (language, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((language, count)),
        })
        .map(|(language, _)| language)
}

/// What a responder reads: the utterance (joined with the previous one when
/// answering a clarification) and the booking reference in play.
struct Request {
    utterance: String,
    text: String,
    lowered: String,
    booking_id: Option<String>,
    follow_up: bool,
}

impl Request {
    fn new(history: &[Turn], utterance: &str, agent: AgentId) -> Self {
        let follow_up = last_agent_turn(history).is_some_and(|turn| {
            !turn.clarification.is_empty() && turn.actual_agent == Some(agent)
        });

        let previous = history.iter().rev().find_map(Turn::as_customer);
        let text = match previous {
            Some(previous) if follow_up => format!("{}\n{}", previous.text, utterance),
            _ => utterance.to_string(),
        };

        let booking_id = booking_refs(utterance)
            .into_iter()
            .next()
            .or_else(|| established_booking(history));

        Self {
            utterance: utterance.trim().to_string(),
            lowered: text.to_lowercase(),
            text,
            booking_id,
            follow_up,
        }
    }

    fn mentions(&self, keywords: &[&str]) -> bool {
        contains_any(&self.lowered, keywords)
    }

    fn mentions_word(&self, words: &[&str]) -> bool {
        contains_word(&self.lowered, words)
    }
}

/// Most recent booking reference stated by the customer or used in a call
/// with customer-supplied params.
fn established_booking(history: &[Turn]) -> Option<String> {
    history.iter().rev().find_map(|turn| match turn {
        Turn::Customer(customer) => booking_refs(&customer.text).pop(),
        Turn::Agent(agent) => agent.tool_calls.iter().rev().find_map(|call| {
            call.param("booking_id")
                .filter(|_| !call.defaulted.iter().any(|d| d == "booking_id"))
                .map(str::to_string)
        }),
    })
}

struct Response {
    reply: String,
    call: Option<ToolCall>,
    missing: Vec<Slot>,
}

impl Response {
    fn answer(reply: String) -> Self {
        Self {
            reply,
            call: None,
            missing: Vec::new(),
        }
    }

    fn call(reply: String, call: ToolCall) -> Self {
        Self {
            reply,
            call: Some(call),
            missing: Vec::new(),
        }
    }

    fn clarify(slots: &[(Slot, bool)], language: Language) -> Self {
        let missing: Vec<Slot> = slots
            .iter()
            .filter(|(_, present)| !present)
            .map(|(slot, _)| *slot)
            .collect();
        Self {
            reply: clarification(&missing, language),
            call: None,
            missing,
        }
    }
}

fn search(request: &Request, language: Language) -> Response {
    if request.mentions(&["refund", "reembolso", "remboursement"]) {
        return match &request.booking_id {
            Some(id) => Response::call(
                render(phrase(Phrase::RefundStatusLookup, language), &[("booking_id", id.as_str())]),
                ToolCall::new("refund_status").with_param("booking_id", id),
            ),
            None => Response::clarify(&[(Slot::BookingId, false)], language),
        };
    }

    let route = keywords::route(&request.text);
    let date = travel_date(&request.text);

    if request.mentions(&["availability", "available", "disponib"]) {
        return match (route, date) {
            (Some((origin, destination)), Some(date)) => {
                let route = format!("{}-{}", origin, destination);
                Response::call(
                    render(
                        phrase(Phrase::Availability, language),
                        &[("route", route.as_str()), ("date", date.as_str())],
                    ),
                    ToolCall::new("check_availability")
                        .with_param("route", route)
                        .with_param("date", date),
                )
            }
            (route, date) => Response::clarify(
                &[
                    (Slot::Origin, route.is_some()),
                    (Slot::Destination, route.is_some()),
                    (Slot::Date, date.is_some()),
                ],
                language,
            ),
        };
    }

    if request.mentions(&["flight", "vuelo", "search", "find", "buscar", "cherche"])
        || request.mentions_word(&["vol", "vols"])
    {
        let (origin, destination) = match route {
            Some((origin, destination)) => (Some(origin), Some(destination)),
            None => (None, keywords::destination(&request.text)),
        };

        return match (origin, destination, date) {
            (Some(origin), Some(destination), Some(date)) => {
                let reply = render(
                    phrase(Phrase::FlightSearch, language),
                    &[
                        ("origin", origin.as_str()),
                        ("destination", destination.as_str()),
                        ("date", date.as_str()),
                    ],
                );
                let mut call = ToolCall::new("search_flights")
                    .with_param("origin", origin)
                    .with_param("destination", destination)
                    .with_param("date", date);
                if let Some(class) = keywords::cabin_class(&request.text) {
                    call = call.with_param("class", class);
                }
                Response::call(reply, call)
            }
            (origin, destination, date) => Response::clarify(
                &[
                    (Slot::Origin, origin.is_some()),
                    (Slot::Destination, destination.is_some()),
                    (Slot::Date, date.is_some()),
                ],
                language,
            ),
        };
    }

    Response::answer(phrase(Phrase::SearchHelp, language).to_string())
}

fn policy(request: &Request, language: Language) -> Response {
    let text = if request.mentions(&[
        "baggage",
        "luggage",
        "allowance",
        "equipaje",
        "bagages",
    ]) {
        Phrase::BaggagePolicy
    } else if request.mentions(&["refund", "reembolso", "remboursement"]) {
        Phrase::RefundPolicy
    } else {
        Phrase::GeneralPolicy
    };

    Response::answer(phrase(text, language).to_string())
}

fn complaint(request: &Request, language: Language) -> Response {
    let kind = if request.mentions(&["luggage", "baggage", "bag", "maleta", "equipaje", "valise"]) {
        "luggage_damage"
    } else {
        "service_issue"
    };

    Response::call(
        phrase(Phrase::ComplaintFiled, language).to_string(),
        ToolCall::new("file_complaint")
            .with_param("type", kind)
            .with_param("description", request.utterance.clone()),
    )
}

fn booking(request: &Request, language: Language) -> Response {
    let booking_id = request.booking_id.clone();

    if request.mentions(&["update", "change", "actualizar", "cambiar", "modifier"]) {
        let field = keywords::passenger_field(&request.text);
        let value = keywords::passenger_value(&request.text);
        return match (booking_id, field, value) {
            (Some(id), Some(field), Some(value)) => Response::call(
                render(
                    phrase(Phrase::PassengerUpdated, language),
                    &[("booking_id", id.as_str()), ("field", field.as_str())],
                ),
                ToolCall::new("update_passenger")
                    .with_param("booking_id", id)
                    .with_param("field", field)
                    .with_param("value", value),
            ),
            (id, field, value) => Response::clarify(
                &[
                    (Slot::BookingId, id.is_some()),
                    (Slot::Field, field.is_some()),
                    (Slot::Value, value.is_some()),
                ],
                language,
            ),
        };
    }

    let (action, template) = if request.mentions(&["confirm"]) {
        ("confirm_booking", Phrase::BookingConfirmed)
    } else {
        ("get_booking_details", Phrase::BookingDetails)
    };

    match booking_id {
        Some(id) => Response::call(
            render(phrase(template, language), &[("booking_id", id.as_str())]),
            ToolCall::new(action).with_param("booking_id", id),
        ),
        None => Response::clarify(&[(Slot::BookingId, false)], language),
    }
}

fn closer(history: &[Turn], language: Language) -> Response {
    let closing = phrase(Phrase::Closing, language);
    let already_ended = history
        .iter()
        .filter_map(Turn::as_agent)
        .any(|turn| turn.contains_end_marker);

    if already_ended {
        Response::answer(closing.to_string())
    } else {
        Response::answer(format!("{} {}", closing, END_CALL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentTurn, CustomerTurn, Intent};

    fn decide(history: &[Turn], utterance: &str) -> AgentAction {
        V1Policy::new().decide(history, utterance).unwrap()
    }

    /// Append a customer turn and the policy's answer to it.
    fn exchange(history: &mut Vec<Turn>, utterance: &str) -> AgentAction {
        let action = decide(history, utterance);
        let turn_id = history.len() as u32 + 1;
        history.push(Turn::Customer(CustomerTurn {
            turn_id,
            text: utterance.to_string(),
            language: Language::English,
            expected_agent: AgentId::Search,
            intent: Intent::Mixed,
        }));
        history.push(Turn::Agent(AgentTurn {
            turn_id: turn_id + 1,
            text: action.reply.clone(),
            actual_agent: action.agent(),
            decision: action.decision.clone(),
            reply_language: action.reply_language,
            tool_calls: action.tool_calls.clone(),
            contains_end_marker: action.contains_end_marker(),
            clarification: action.clarification.clone(),
            timestamp_start_us: 0,
            timestamp_end_us: 0,
        }));
        action
    }

    #[test]
    fn test_luggage_routes_to_policy() {
        let action = decide(&[], "How much luggage can I carry?");
        assert_eq!(action.agent(), Some(AgentId::Policy));
        assert!(action.tool_calls.is_empty());
        assert_eq!(action.reply_language, Language::English);
        assert!(action.reply.contains("15kg"));
    }

    #[test]
    fn test_refund_policy_questions_route_to_policy() {
        for utterance in [
            "What is your refund policy?",
            "Can I get a refund for my flight?",
            "What are the refund terms and conditions?",
        ] {
            let action = decide(&[], utterance);
            assert_eq!(action.agent(), Some(AgentId::Policy), "{}", utterance);
            assert!(action.tool_calls.is_empty());
            assert_eq!(action.reply, phrase(Phrase::RefundPolicy, Language::English));
        }
        assert_eq!(decide(&[], "When will I get my refund?").agent(), Some(AgentId::Search));
    }

    #[test]
    fn test_refund_status_single_call() {
        let action = decide(&[], "What's my refund status for booking 789?");
        assert_eq!(
            action.decision,
            RoutingDecision::Keyword {
                primary: AgentId::Search,
                overlapping_candidates: vec![],
            }
        );
        assert_eq!(action.tool_calls.len(), 1);
        assert_eq!(action.tool_calls[0].param("booking_id"), Some("789"));
    }

    #[test]
    fn test_goodbye_routes_to_closer() {
        let action = decide(&[], "goodbye");
        assert_eq!(action.agent(), Some(AgentId::Closer));
        assert!(action.reply.ends_with(" <END_CALL>"));
        assert_eq!(action.reply.matches(END_CALL).count(), 1);
    }

    #[test]
    fn test_second_closer_turn_has_no_marker() {
        let mut history = Vec::new();
        let first = exchange(&mut history, "That's all for baggage. What is the baggage policy?");
        let second = exchange(&mut history, "goodbye");

        assert_eq!(first.agent(), Some(AgentId::Closer));
        assert_eq!(second.agent(), Some(AgentId::Closer));
        assert!(first.contains_end_marker());
        assert!(!second.contains_end_marker());

        let markers: usize = history
            .iter()
            .filter_map(Turn::as_agent)
            .map(|turn| turn.text.matches(END_CALL).count())
            .sum();
        assert_eq!(markers, 1);
    }

    #[test]
    fn test_words_containing_vol_are_not_flight_requests() {
        assert_eq!(decide(&[], "I want to involve a manager").agent(), None);

        let mut history = Vec::new();
        exchange(&mut history, "Check my refund status for booking ID 456");
        let action = exchange(&mut history, "What is the volume limit?");
        assert_eq!(action.decision, RoutingDecision::Context { agent: AgentId::Search });
        assert!(action.clarification.is_empty());
        assert!(action.tool_calls.is_empty());
    }

    #[test]
    fn test_no_match_without_history() {
        let action = decide(&[], "789");
        assert_eq!(action.decision, RoutingDecision::NoConfidentMatch);
        assert_eq!(action.clarification, vec![Slot::Intent]);
        assert_eq!(action.reply_language, Language::English);
        assert!(action.tool_calls.is_empty());
    }

    #[test]
    fn test_missing_booking_ref_asks_then_follows_up() {
        let mut history = Vec::new();

        let first = exchange(&mut history, "Necesito verificar el estado de mi reembolso");
        assert_eq!(first.agent(), Some(AgentId::Search));
        assert_eq!(first.reply_language, Language::Spanish);
        assert_eq!(first.clarification, vec![Slot::BookingId]);
        assert!(first.tool_calls.is_empty());

        let second = exchange(&mut history, "Es 789");
        assert_eq!(second.decision, RoutingDecision::Context { agent: AgentId::Search });
        assert_eq!(second.reply_language, Language::Spanish);
        assert_eq!(second.tool_calls[0].action, "refund_status");
        assert_eq!(second.tool_calls[0].param("booking_id"), Some("789"));
    }

    #[test]
    fn test_flight_search_collects_slots() {
        let mut history = Vec::new();

        let first = exchange(&mut history, "Search for flights to New York");
        assert_eq!(first.clarification, vec![Slot::Origin, Slot::Date]);

        let second = exchange(&mut history, "From Boston to New York, tomorrow please");
        let call = &second.tool_calls[0];
        assert_eq!(call.action, "search_flights");
        assert_eq!(call.param("origin"), Some("Boston"));
        assert_eq!(call.param("destination"), Some("New York"));
        assert_eq!(call.param("date"), Some("tomorrow"));
        assert!(!call.has_defaults());
    }

    #[test]
    fn test_booking_ref_reused_from_context() {
        let mut history = Vec::new();
        exchange(&mut history, "What's my refund status for booking 456?");

        let action = exchange(&mut history, "Please confirm my booking");
        assert_eq!(action.agent(), Some(AgentId::Booking));
        assert_eq!(action.tool_calls[0].action, "confirm_booking");
        assert_eq!(action.tool_calls[0].param("booking_id"), Some("456"));
    }

    #[test]
    fn test_passenger_update_needs_value() {
        let mut history = Vec::new();
        let first = exchange(&mut history, "I need to update my passenger name for booking 321");
        assert_eq!(first.clarification, vec![Slot::Value]);

        let second = exchange(&mut history, "Change the name to Ana Diaz");
        let call = &second.tool_calls[0];
        assert_eq!(call.action, "update_passenger");
        assert_eq!(call.param("booking_id"), Some("321"));
        assert_eq!(call.param("field"), Some("name"));
        assert_eq!(call.param("value"), Some("Ana Diaz"));
    }

    #[test]
    fn test_complaint_always_files() {
        let action = decide(&[], "Ma valise est arrivée endommagée");
        assert_eq!(action.agent(), Some(AgentId::Complaint));
        assert_eq!(action.reply_language, Language::French);
        let call = &action.tool_calls[0];
        assert_eq!(call.param("type"), Some("luggage_damage"));
        assert_eq!(call.param("description"), Some("Ma valise est arrivée endommagée"));
    }

    #[test]
    fn test_language_falls_back_to_dominant() {
        let mut history = Vec::new();
        exchange(&mut history, "Quelle est la politique de bagages?");

        let action = exchange(&mut history, "789");
        assert_eq!(action.reply_language, Language::French);
        assert_eq!(action.decision, RoutingDecision::Context { agent: AgentId::Policy });
    }

    #[test]
    fn test_dominant_language_tie_goes_to_earliest() {
        let mut history = Vec::new();
        exchange(&mut history, "Quelle est la politique de bagages?");
        exchange(&mut history, "What is the baggage policy?");
        assert_eq!(dominant_language(&history), Some(Language::French));
    }

    #[test]
    fn test_context_skips_closer() {
        let mut history = Vec::new();
        exchange(&mut history, "My luggage arrived with damage");
        exchange(&mut history, "goodbye");

        let action = decide(&history, "789");
        assert_eq!(action.decision, RoutingDecision::Context { agent: AgentId::Complaint });
    }
}

//! Conversation source: scripted customer utterances with ground truth.
//!
//! [`ScriptedSource`] draws conversations from a fixed scenario library with a
//! seeded RNG, so the same settings always produce the same scripts.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EvaluationConfig;
use crate::types::{AgentId, Intent, Language};

/// One scripted customer utterance with its ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerUtterance {
    pub text: String,
    pub language: Language,
    pub expected_agent: AgentId,
    pub intent: Intent,
}

/// The customer side of one conversation, before simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationScript {
    pub conv_id: u32,
    pub scenario: String,
    pub utterances: Vec<CustomerUtterance>,
}

/// Anything that can supply conversation scripts.
pub trait ConversationSource {
    fn scripts(&self) -> Vec<ConversationScript>;
}

/// A source wrapping scripts built elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    scripts: Vec<ConversationScript>,
}

impl StaticSource {
    pub fn new(scripts: Vec<ConversationScript>) -> Self {
        Self { scripts }
    }
}

impl ConversationSource for StaticSource {
    fn scripts(&self) -> Vec<ConversationScript> {
        self.scripts.clone()
    }
}

/// Seeded generator over the built-in scenario library.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedSource {
    pub conversation_count: usize,
    pub seed: u64,
    pub min_turns: usize,
    pub max_turns: usize,
    pub languages: Vec<Language>,
    /// End every conversation with a farewell utterance
    pub farewell: bool,
}

impl ScriptedSource {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            conversation_count: config.conversation_count,
            seed: config.seed,
            min_turns: config.min_turns,
            max_turns: config.max_turns,
            languages: config.languages.clone(),
            farewell: config.farewell,
        }
    }

    fn generate(&self, conv_id: u32, rng: &mut StdRng) -> ConversationScript {
        let language = self
            .languages
            .choose(rng)
            .copied()
            .unwrap_or(Language::English);

        let candidates: Vec<&'static Scenario> = scenarios(language).collect();
        let scenario = candidates.choose(rng).copied().unwrap_or(&SCENARIOS[0]);

        let low = self.min_turns.max(1);
        let turns = rng.gen_range(low..=self.max_turns.max(low));
        let body_len = if self.farewell { turns - 1 } else { turns };

        // The scenario's own utterances lead, the rest of the language's
        // pool follows in seeded order.
        let mut rest: Vec<&'static Template> = scenarios(scenario.language)
            .filter(|other| other.name != scenario.name)
            .flat_map(|other| other.templates.iter())
            .collect();
        rest.shuffle(rng);

        let ordered: Vec<&'static Template> =
            scenario.templates.iter().chain(rest).collect();

        let mut utterances: Vec<CustomerUtterance> = ordered
            .iter()
            .cycle()
            .take(body_len)
            .map(|template| template.utterance(scenario.language))
            .collect();

        if self.farewell {
            utterances.push(farewell(scenario.language).utterance(scenario.language));
        }

        debug!(
            conv_id,
            scenario = scenario.name,
            language = %scenario.language,
            turns = utterances.len(),
            "generated script"
        );

        ConversationScript {
            conv_id,
            scenario: scenario.name.to_string(),
            utterances,
        }
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self {
            conversation_count: 6,
            seed: 42,
            min_turns: 4,
            max_turns: 6,
            languages: Language::ALL.to_vec(),
            farewell: true,
        }
    }
}

impl ConversationSource for ScriptedSource {
    fn scripts(&self) -> Vec<ConversationScript> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (1..=self.conversation_count)
            .map(|conv_id| self.generate(conv_id as u32, &mut rng))
            .collect()
    }
}

// =========================================================================
// SCENARIO LIBRARY
// =========================================================================

#[derive(Debug)]
struct Template {
    text: &'static str,
    agent: AgentId,
    intent: Intent,
}

impl Template {
    fn utterance(&self, language: Language) -> CustomerUtterance {
        CustomerUtterance {
            text: self.text.to_string(),
            language,
            expected_agent: self.agent,
            intent: self.intent,
        }
    }
}

#[derive(Debug)]
struct Scenario {
    name: &'static str,
    language: Language,
    templates: &'static [Template],
}

const fn t(text: &'static str, agent: AgentId, intent: Intent) -> Template {
    Template {
        text,
        agent,
        intent,
    }
}

use AgentId::{Booking, Complaint, Policy, Search};
use Intent::{BaggagePolicy, BookingDetails, FlightSearch, Mixed, RefundPolicy, RefundStatus};

static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "refund_status",
        language: Language::English,
        templates: &[
            t("Check my refund status for booking ID 456", Search, RefundStatus),
            t("When will I get my refund?", Search, RefundStatus),
            t("I need to know about my refund for booking 789", Search, RefundStatus),
        ],
    },
    Scenario {
        name: "refund_policy",
        language: Language::English,
        templates: &[
            t("What is your refund policy?", Policy, RefundPolicy),
            t("Can I get a refund for my flight?", Policy, RefundPolicy),
            t("What are the refund terms and conditions?", Policy, RefundPolicy),
        ],
    },
    Scenario {
        name: "flight_search",
        language: Language::English,
        templates: &[
            t("Find me a flight from BLR to DEL on September 15", Search, FlightSearch),
            t("I need flights from Mumbai to Bangalore tomorrow", Search, FlightSearch),
            t("Search for flights to New York next week", Search, FlightSearch),
        ],
    },
    Scenario {
        name: "baggage_policy",
        language: Language::English,
        templates: &[
            t("What is the baggage allowance for domestic flights?", Policy, BaggagePolicy),
            t("How much luggage can I carry?", Policy, BaggagePolicy),
            t("What are the baggage rules for international flights?", Policy, BaggagePolicy),
        ],
    },
    Scenario {
        name: "complaint",
        language: Language::English,
        templates: &[
            t("My luggage was damaged during the flight", Complaint, Intent::Complaint),
            t("I have a complaint about the service", Complaint, Intent::Complaint),
            t("The staff was very rude to me", Complaint, Intent::Complaint),
        ],
    },
    Scenario {
        name: "booking_details",
        language: Language::English,
        templates: &[
            t("Can you confirm my booking details?", Booking, BookingDetails),
            t("I need to update my passenger information", Booking, BookingDetails),
            t("What are the details for booking 12345?", Booking, BookingDetails),
        ],
    },
    Scenario {
        name: "mixed",
        language: Language::English,
        templates: &[
            t("I want to book a flight and also check my refund status", Search, Mixed),
            t("What's the baggage policy and can I get a refund?", Policy, Mixed),
            t("I have a complaint and need to search for flights", Complaint, Mixed),
        ],
    },
    Scenario {
        name: "spanish_refund_status",
        language: Language::Spanish,
        templates: &[
            t("Necesito verificar el estado de mi reembolso", Search, RefundStatus),
            t("Mi número de reserva es 456", Search, RefundStatus),
        ],
    },
    Scenario {
        name: "spanish_baggage_policy",
        language: Language::Spanish,
        templates: &[t("¿Cuál es la política de equipaje?", Policy, BaggagePolicy)],
    },
    Scenario {
        name: "spanish_flight_search",
        language: Language::Spanish,
        templates: &[
            t("Quiero buscar un vuelo de Madrid a Barcelona", Search, FlightSearch),
            t("Para mañana, por favor", Search, FlightSearch),
        ],
    },
    Scenario {
        name: "spanish_complaint",
        language: Language::Spanish,
        templates: &[t("Mi maleta llegó dañada", Complaint, Intent::Complaint)],
    },
    Scenario {
        name: "french_refund_status",
        language: Language::French,
        templates: &[
            t("Je voudrais vérifier le statut de mon remboursement", Search, RefundStatus),
            t("Mon numéro de réservation est 789", Search, RefundStatus),
        ],
    },
    Scenario {
        name: "french_baggage_policy",
        language: Language::French,
        templates: &[t("Quelle est la politique de bagages?", Policy, BaggagePolicy)],
    },
    Scenario {
        name: "french_flight_search",
        language: Language::French,
        templates: &[
            t("Je cherche un vol de Paris à Lyon", Search, FlightSearch),
            t("Pour demain, s'il vous plaît", Search, FlightSearch),
        ],
    },
    Scenario {
        name: "french_complaint",
        language: Language::French,
        templates: &[t("Ma valise est arrivée endommagée", Complaint, Intent::Complaint)],
    },
];

static FAREWELLS: &[(Language, Template)] = &[
    (
        Language::English,
        t("That's all, thank you. Goodbye!", AgentId::Closer, Intent::Farewell),
    ),
    (
        Language::Spanish,
        t("Gracias, eso es todo. ¡Adiós!", AgentId::Closer, Intent::Farewell),
    ),
    (
        Language::French,
        t("Merci, c'est tout. Au revoir !", AgentId::Closer, Intent::Farewell),
    ),
];

fn scenarios(language: Language) -> impl Iterator<Item = &'static Scenario> {
    SCENARIOS
        .iter()
        .filter(move |scenario| scenario.language == language)
}

fn farewell(language: Language) -> &'static Template {
    FAREWELLS
        .iter()
        .find(|(l, _)| *l == language)
        .map(|(_, template)| template)
        .unwrap_or(&FAREWELLS[0].1)
}

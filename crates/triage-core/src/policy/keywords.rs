//! Keyword tables and extraction patterns shared by the routing policies.
//!
//! Routing is plain containment of lower-cased keywords, checked category by
//! category in table order. Short keywords that occur inside unrelated words
//! are listed as `words` and only match a whole token. Slot extraction
//! (booking references, routes, dates) uses the regexes below.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{AgentId, Language};

/// Keywords that route an utterance to one agent.
#[derive(Debug, Clone, Copy)]
pub struct KeywordCategory {
    pub agent: AgentId,
    pub keywords: &'static [&'static str],
    /// Matched against whole tokens only
    pub words: &'static [&'static str],
}

impl KeywordCategory {
    pub fn matches(&self, lowered: &str) -> bool {
        contains_any(lowered, self.keywords) || contains_word(lowered, self.words)
    }
}

// =========================================================================
// v0 TABLE
// =========================================================================

/// v0 priority order. Baggage and luggage sit under Search.
pub static V0_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        agent: AgentId::Search,
        keywords: &[
            "search",
            "find",
            "flight",
            "refund status",
            "booking id",
            "baggage",
            "luggage",
        ],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Policy,
        keywords: &["policy", "allowance", "refund policy", "rules", "terms"],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Complaint,
        keywords: &["complaint", "damage", "problem", "issue"],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Booking,
        keywords: &["booking", "passenger", "details", "confirm"],
        words: &[],
    },
];

/// v0 end-of-chat triggers, matched as raw substrings.
pub static V0_GOODBYE: &[&str] = &["bye", "goodbye", "end", "close", "finish"];

// =========================================================================
// v1 TABLE
// =========================================================================

/// v1 priority order. No keyword appears in more than one category.
pub static V1_CATEGORIES: &[KeywordCategory] = &[
    KeywordCategory {
        agent: AgentId::Closer,
        keywords: &[
            "goodbye",
            "bye",
            "that's all",
            "adiós",
            "adios",
            "au revoir",
            "hasta luego",
        ],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Complaint,
        keywords: &[
            "complaint",
            "damage",
            "rude",
            "problem",
            "issue",
            "queja",
            "dañad",
            "plainte",
            "endommag",
        ],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Policy,
        keywords: &[
            "policy",
            "baggage",
            "luggage",
            "allowance",
            "rules",
            "terms",
            "can i get a refund",
            "política",
            "equipaje",
            "politique",
            "bagages",
        ],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Booking,
        keywords: &[
            "booking details",
            "passenger",
            "confirm",
            "update my",
            "details for booking",
            "detalles",
            "pasajero",
            "passager",
            "confirmer",
        ],
        words: &[],
    },
    KeywordCategory {
        agent: AgentId::Search,
        keywords: &[
            "refund",
            "flight",
            "search",
            "find",
            "availability",
            "available",
            "reembolso",
            "vuelo",
            "buscar",
            "remboursement",
            "cherche",
        ],
        words: &["vol", "vols"],
    },
];

lazy_static! {
    // =========================================================================
    // SLOT PATTERNS
    // =========================================================================

    /// Booking reference: a run of at least three digits
    pub static ref BOOKING_REF_PATTERN: Regex = Regex::new(r"\b\d{3,}\b").unwrap();

    /// "from X to Y", "de X a Y", "de X à Y". Place names may span several
    /// capitalized words; the Spanish and French forms need a capitalized
    /// origin and destination.
    pub static ref ROUTE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b(?i:from)\s+(\p{L}+(?:[ \t]+\p{Lu}\p{L}*)*)\s+(?i:to)\s+(\p{L}+(?:[ \t]+\p{Lu}\p{L}*)*)").unwrap(),
        Regex::new(r"\b(?i:de)\s+(\p{Lu}\p{L}*(?:[ \t]+\p{Lu}\p{L}*)*)\s+a\s+(\p{Lu}\p{L}*(?:[ \t]+\p{Lu}\p{L}*)*)").unwrap(),
        Regex::new(r"\b(?i:de)\s+(\p{Lu}\p{L}*(?:[ \t]+\p{Lu}\p{L}*)*)\s+à\s+(\p{Lu}\p{L}*(?:[ \t]+\p{Lu}\p{L}*)*)").unwrap(),
    ];

    /// A capitalized destination without an origin ("to New York")
    pub static ref DESTINATION_PATTERN: Regex =
        Regex::new(r"\bto\s+(\p{Lu}\p{L}*(?:[ \t]+\p{Lu}\p{L}*)*)").unwrap();

    /// Travel dates as customers state them
    pub static ref DATE_PATTERN: Regex = Regex::new(
        r"(?i)\b(today|tonight|tomorrow|next week|next month|(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}|\d{4}-\d{2}-\d{2}|hoy|mañana|demain)\b"
    ).unwrap();

    /// Cabin class
    pub static ref CLASS_PATTERN: Regex =
        Regex::new(r"(?i)\b(economy|business|first)\b").unwrap();

    /// Passenger record field being changed
    pub static ref FIELD_PATTERN: Regex =
        Regex::new(r"(?i)\b(name|contact|email|phone)\b").unwrap();

    /// New value for a passenger record field ("... to Ana Diaz")
    pub static ref VALUE_PATTERN: Regex =
        Regex::new(r"(?i)\b(?:name|contact|email|phone)\b.*?\bto\s+(\S.*?)[.!?]?$").unwrap();

    // =========================================================================
    // LANGUAGE DETECTION
    // =========================================================================

    static ref ENGLISH_WORDS: HashSet<&'static str> = [
        "the", "my", "what", "is", "i", "can", "you", "for", "how", "need",
        "please", "thanks", "thank", "want", "when", "will", "get", "find",
        "flight", "flights", "refund", "booking", "luggage", "baggage",
        "policy", "with", "have", "was", "about", "me", "to", "goodbye",
        "all", "that's", "your", "details", "are", "much", "search", "check",
        "status", "and", "carry",
    ].into_iter().collect();

    static ref SPANISH_WORDS: HashSet<&'static str> = [
        "necesito", "verificar", "estado", "reembolso", "cuál", "cual",
        "política", "equipaje", "quiero", "buscar", "vuelo", "maleta",
        "llegó", "dañada", "número", "reserva", "gracias", "eso", "todo",
        "adiós", "adios", "hola", "mi", "es", "el", "por", "favor", "del",
    ].into_iter().collect();

    static ref FRENCH_WORDS: HashSet<&'static str> = [
        "je", "voudrais", "vérifier", "statut", "mon", "ma", "remboursement",
        "quelle", "est", "politique", "bagages", "cherche", "vol", "valise",
        "arrivée", "endommagée", "numéro", "réservation", "merci", "c'est",
        "tout", "au", "revoir", "bonjour", "pour", "vous", "du",
    ].into_iter().collect();
}

/// Check if lower-cased text contains any of the keywords.
pub fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| lowered.contains(kw))
}

/// Every category of the table that matches, in priority order.
pub fn matched_agents(lowered: &str, table: &[KeywordCategory]) -> Vec<AgentId> {
    table
        .iter()
        .filter(|category| category.matches(lowered))
        .map(|category| category.agent)
        .collect()
}

/// Check if any of the words occurs as a whole token of the text.
pub fn contains_word(text: &str, words: &[&str]) -> bool {
    !words.is_empty() && tokens(text).iter().any(|t| words.contains(&t.as_str()))
}

/// Booking references in order of appearance.
pub fn booking_refs(text: &str) -> Vec<String> {
    BOOKING_REF_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Origin and destination, when the utterance names a full route.
pub fn route(text: &str) -> Option<(String, String)> {
    ROUTE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
    })
}

pub fn destination(text: &str) -> Option<String> {
    DESTINATION_PATTERN
        .captures(text)
        .map(|caps| caps[1].to_string())
}

pub fn travel_date(text: &str) -> Option<String> {
    DATE_PATTERN
        .captures(text)
        .map(|caps| caps[1].to_lowercase())
}

pub fn cabin_class(text: &str) -> Option<String> {
    CLASS_PATTERN
        .captures(text)
        .map(|caps| caps[1].to_lowercase())
}

pub fn passenger_field(text: &str) -> Option<String> {
    FIELD_PATTERN
        .captures(text)
        .map(|caps| caps[1].to_lowercase())
}

pub fn passenger_value(text: &str) -> Option<String> {
    VALUE_PATTERN
        .captures(text.trim())
        .map(|caps| caps[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lower-cased word tokens (letters and apostrophes).
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphabetic() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Detect the language of an utterance from its vocabulary.
///
/// Returns `None` when no language scores strictly higher than the others.
pub fn detect_language(text: &str) -> Option<Language> {
    let words = tokens(text);
    let score = |vocabulary: &HashSet<&'static str>| {
        words.iter().filter(|w| vocabulary.contains(w.as_str())).count()
    };

    let scores = [
        (Language::English, score(&ENGLISH_WORDS)),
        (Language::Spanish, score(&SPANISH_WORDS)),
        (Language::French, score(&FRENCH_WORDS)),
    ];

    let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
    if best == 0 {
        return None;
    }

    let mut leaders = scores.iter().filter(|(_, s)| *s == best);
    match (leaders.next(), leaders.next()) {
        (Some((language, _)), None) => Some(*language),
        _ => None,
    }
}

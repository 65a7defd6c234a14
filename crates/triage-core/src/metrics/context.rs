//! Context retention predicates.
//!
//! A predicate judges whether an agent turn is consistent with information
//! the conversation established before it. Predicates only look at
//! structured turn fields (booking references, tool params, requested
//! slots), never at free-text meaning.

use std::collections::BTreeSet;

use crate::policy::keywords::booking_refs;
use crate::types::{Slot, Turn, TurnPair};

/// Judges one customer/agent pair against the turns before it.
pub trait ContextPredicate: Send + Sync {
    /// Name stated in the report.
    fn name(&self) -> &str;

    fn is_consistent(&self, earlier: &[Turn], pair: TurnPair<'_>) -> bool;
}

/// Booking references must be reused rather than asked for again or
/// replaced with unrelated values.
///
/// With no reference established yet, a turn is consistent when any agent
/// handled it. Once one is established, a turn is inconsistent when it asks
/// for the booking reference again, or sends a `booking_id` that was neither
/// established nor stated in the current utterance.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReusePredicate;

impl EntityReusePredicate {
    pub const NAME: &'static str = "entity_reuse";
}

/// Booking references stated by the customer or sent with customer-supplied
/// params before the current turn.
pub fn established_booking_refs(earlier: &[Turn]) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for turn in earlier {
        match turn {
            Turn::Customer(customer) => refs.extend(booking_refs(&customer.text)),
            Turn::Agent(agent) => {
                for call in &agent.tool_calls {
                    if call.defaulted.iter().any(|d| d == "booking_id") {
                        continue;
                    }
                    if let Some(id) = call.param("booking_id") {
                        refs.insert(id.to_string());
                    }
                }
            }
        }
    }
    refs
}

impl ContextPredicate for EntityReusePredicate {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_consistent(&self, earlier: &[Turn], pair: TurnPair<'_>) -> bool {
        let established = established_booking_refs(earlier);
        if established.is_empty() {
            return pair.agent.actual_agent.is_some();
        }

        if pair.agent.asks_for(Slot::BookingId) {
            return false;
        }

        let stated = booking_refs(&pair.customer.text);
        pair.agent
            .tool_calls
            .iter()
            .filter_map(|call| call.param("booking_id"))
            .all(|id| established.contains(id) || stated.iter().any(|s| s == id))
    }
}

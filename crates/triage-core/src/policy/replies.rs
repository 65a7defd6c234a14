//! Localized reply phrases for the corrected policy.
//!
//! Templates use `{name}` placeholders filled by [`render`].

use crate::types::{Language, Slot};

/// Reply templates, one per situation a responder can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    RefundStatusLookup,
    FlightSearch,
    Availability,
    SearchHelp,
    BaggagePolicy,
    RefundPolicy,
    GeneralPolicy,
    ComplaintFiled,
    BookingDetails,
    BookingConfirmed,
    PassengerUpdated,
    Clarify,
    NoMatch,
    Closing,
}

pub fn phrase(phrase: Phrase, language: Language) -> &'static str {
    use Language::*;
    use Phrase::*;

    match (phrase, language) {
        (RefundStatusLookup, English) => "I'm checking the refund status for booking {booking_id} now.",
        (RefundStatusLookup, Spanish) => "Estoy consultando el estado del reembolso de la reserva {booking_id}.",
        (RefundStatusLookup, French) => "Je vérifie le statut du remboursement de la réservation {booking_id}.",

        (FlightSearch, English) => "Searching flights from {origin} to {destination} for {date}.",
        (FlightSearch, Spanish) => "Buscando vuelos de {origin} a {destination} para {date}.",
        (FlightSearch, French) => "Je recherche des vols de {origin} à {destination} pour {date}.",

        (Availability, English) => "Checking seat availability on {route} for {date}.",
        (Availability, Spanish) => "Consultando la disponibilidad en {route} para {date}.",
        (Availability, French) => "Je vérifie la disponibilité sur {route} pour {date}.",

        (SearchHelp, English) => "I can look up flights, seat availability and refund status for you. What would you like to check?",
        (SearchHelp, Spanish) => "Puedo buscar vuelos, disponibilidad y el estado de un reembolso. ¿Qué desea consultar?",
        (SearchHelp, French) => "Je peux rechercher des vols, la disponibilité ou le statut d'un remboursement. Que souhaitez-vous vérifier ?",

        (BaggagePolicy, English) => "Domestic flights allow 15kg checked and 7kg cabin baggage; international flights allow 23kg checked and 7kg cabin baggage.",
        (BaggagePolicy, Spanish) => "Los vuelos nacionales permiten 15 kg facturados y 7 kg en cabina; los internacionales, 23 kg facturados y 7 kg en cabina.",
        (BaggagePolicy, French) => "Les vols intérieurs autorisent 15 kg en soute et 7 kg en cabine ; les vols internationaux 23 kg en soute et 7 kg en cabine.",

        (RefundPolicy, English) => "Refunds are processed within 5-7 business days and processing fees may apply.",
        (RefundPolicy, Spanish) => "Los reembolsos se procesan en 5 a 7 días hábiles y pueden aplicarse cargos de gestión.",
        (RefundPolicy, French) => "Les remboursements sont traités sous 5 à 7 jours ouvrés et des frais de dossier peuvent s'appliquer.",

        (GeneralPolicy, English) => "Fare rules and terms are attached to every booking. Which policy would you like to know about?",
        (GeneralPolicy, Spanish) => "Las reglas y condiciones de la tarifa acompañan cada reserva. ¿Sobre qué política desea información?",
        (GeneralPolicy, French) => "Les règles et conditions tarifaires accompagnent chaque réservation. Quelle politique vous intéresse ?",

        (ComplaintFiled, English) => "I'm sorry about this. I've filed a complaint and a specialist will follow up with you.",
        (ComplaintFiled, Spanish) => "Lamento lo ocurrido. He registrado su queja y un especialista le contactará.",
        (ComplaintFiled, French) => "Je suis désolé. J'ai enregistré votre réclamation et un conseiller vous recontactera.",

        (BookingDetails, English) => "Here are the details for booking {booking_id}.",
        (BookingDetails, Spanish) => "Estos son los detalles de la reserva {booking_id}.",
        (BookingDetails, French) => "Voici les détails de la réservation {booking_id}.",

        (BookingConfirmed, English) => "Booking {booking_id} is confirmed.",
        (BookingConfirmed, Spanish) => "La reserva {booking_id} está confirmada.",
        (BookingConfirmed, French) => "La réservation {booking_id} est confirmée.",

        (PassengerUpdated, English) => "I've updated the passenger {field} on booking {booking_id}.",
        (PassengerUpdated, Spanish) => "He actualizado el dato {field} del pasajero en la reserva {booking_id}.",
        (PassengerUpdated, French) => "J'ai mis à jour le champ {field} du passager sur la réservation {booking_id}.",

        (Clarify, English) => "To continue, could you share {slots}?",
        (Clarify, Spanish) => "Para continuar, ¿podría indicarme {slots}?",
        (Clarify, French) => "Pour continuer, pourriez-vous m'indiquer {slots} ?",

        (NoMatch, English) => "I want to send you to the right specialist. Could you tell me a little more about what you need?",
        (NoMatch, Spanish) => "Quiero dirigirle al especialista adecuado. ¿Podría contarme un poco más sobre lo que necesita?",
        (NoMatch, French) => "Je veux vous orienter vers le bon conseiller. Pouvez-vous m'en dire un peu plus sur votre demande ?",

        (Closing, English) => "Thank you for contacting us. Have a great day!",
        (Closing, Spanish) => "Gracias por contactarnos. ¡Que tenga un buen día!",
        (Closing, French) => "Merci de nous avoir contactés. Excellente journée !",
    }
}

impl Slot {
    /// How a clarification reply names the slot.
    pub fn prompt(&self, language: Language) -> &'static str {
        use Language::*;

        match (self, language) {
            (Slot::BookingId, English) => "your booking reference",
            (Slot::BookingId, Spanish) => "su número de reserva",
            (Slot::BookingId, French) => "votre numéro de réservation",
            (Slot::Origin, English) => "the departure city",
            (Slot::Origin, Spanish) => "la ciudad de salida",
            (Slot::Origin, French) => "la ville de départ",
            (Slot::Destination, English) => "the destination",
            (Slot::Destination, Spanish) => "el destino",
            (Slot::Destination, French) => "la destination",
            (Slot::Date, English) => "the travel date",
            (Slot::Date, Spanish) => "la fecha del viaje",
            (Slot::Date, French) => "la date du voyage",
            (Slot::Field, English) => "which detail to change",
            (Slot::Field, Spanish) => "qué dato desea cambiar",
            (Slot::Field, French) => "l'information à modifier",
            (Slot::Value, English) => "the new value",
            (Slot::Value, Spanish) => "el nuevo valor",
            (Slot::Value, French) => "la nouvelle valeur",
            (Slot::Intent, English) => "what you need help with",
            (Slot::Intent, Spanish) => "en qué necesita ayuda",
            (Slot::Intent, French) => "l'objet de votre demande",
        }
    }
}

fn conjunction(language: Language) -> &'static str {
    match language {
        Language::English => "and",
        Language::Spanish => "y",
        Language::French => "et",
    }
}

/// Fill `{name}` placeholders.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// A clarification reply listing every missing slot.
pub fn clarification(slots: &[Slot], language: Language) -> String {
    let prompts: Vec<&str> = slots.iter().map(|slot| slot.prompt(language)).collect();
    let listed = match prompts.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} {} {}", init.join(", "), conjunction(language), last),
    };
    render(phrase(Phrase::Clarify, language), &[("slots", listed.as_str())])
}

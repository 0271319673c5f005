//! Deterministic keyword classifier used when the remote classifier is
//! unavailable (breaker open, timeout, transport error).
//!
//! Output depends only on the input text, so repeated fallbacks for the
//! same utterance always produce the same classification.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::intent::{Classification, Entities, FuelType, Intent, FUEL_TYPE_ENTITY, STATION_ENTITY};
use crate::domain::session::ConversationContext;

/// Confidence reported for a keyword hit.
pub const KEYWORD_CONFIDENCE: f32 = 0.6;

/// Confidence reported for a bare follow-up.
pub const FOLLOW_UP_CONFIDENCE: f32 = 0.5;

static KEYWORDS: Lazy<HashMap<&'static str, Intent>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for word in ["price", "prices", "cost", "costs", "cheap", "cheapest", "much"] {
        map.insert(word, Intent::PriceQuery);
    }
    for word in ["station", "stations", "where"] {
        map.insert(word, Intent::StationList);
    }
    for word in ["settings", "setting", "alert", "alerts", "notify", "notifications", "configure"] {
        map.insert(word, Intent::Settings);
    }
    for word in ["stats", "statistics", "trend", "trends", "history"] {
        map.insert(word, Intent::Stats);
    }
    for word in ["unsubscribe", "stop"] {
        map.insert(word, Intent::Unsubscribe);
    }
    for word in ["help", "commands"] {
        map.insert(word, Intent::Help);
    }
    for word in ["hi", "hello", "hey", "start"] {
        map.insert(word, Intent::Greeting);
    }
    map
});

const FOLLOW_UP_MARKERS: [&str; 3] = ["and", "also", "about"];

/// Keyword-based fallback classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClassifier;

impl LocalClassifier {
    /// Creates a new local classifier.
    pub fn new() -> Self {
        Self
    }

    /// Classifies `text` without any external call.
    pub fn classify(&self, text: &str) -> Classification {
        let tokens = tokenize(text);
        let entities = extract_entities(&tokens);

        // A station mention only counts as a station-list request when no
        // more specific intent is present ("diesel price at station 12").
        let mut intent = None;
        for token in &tokens {
            if let Some(found) = KEYWORDS.get(token.as_str()) {
                match (intent, found) {
                    (None, _) | (Some(Intent::StationList), _) => intent = Some(*found),
                    _ => {}
                }
            }
        }

        match intent {
            Some(intent) => Classification::new(intent, entities, KEYWORD_CONFIDENCE),
            None if starts_follow_up(&tokens) || !entities.is_empty() => {
                Classification::new(Intent::FollowUp, entities, FOLLOW_UP_CONFIDENCE)
            }
            None => Classification::new(Intent::Unknown, entities, 0.0),
        }
    }
}

/// Resolves a follow-up classification against the prior context.
///
/// A context-dependent intent inherits the prior intent, and entities are a
/// shallow union with the new values winning. Without usable context a bare
/// follow-up degrades to `Unknown`.
pub fn resolve_follow_up(
    classification: Classification,
    context: Option<&ConversationContext>,
) -> Classification {
    if !classification.intent.needs_context() {
        return classification;
    }

    let prior_intent = context.and_then(|ctx| ctx.intent());
    match (prior_intent, context) {
        (Some(prior), Some(ctx))
            if classification.intent == Intent::FollowUp || !classification.entities.is_empty() =>
        {
            let mut entities = ctx.entities().clone();
            entities.extend(classification.entities);
            Classification::new(prior, entities, classification.confidence)
        }
        _ if classification.intent == Intent::FollowUp => Classification::new(
            Intent::Unknown,
            classification.entities,
            classification.confidence,
        ),
        _ => classification,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn extract_entities(tokens: &[String]) -> Entities {
    let mut entities = Entities::new();

    if let Some(fuel) = tokens.iter().find_map(|t| FuelType::from_token(t)) {
        entities.insert(FUEL_TYPE_ENTITY.to_string(), fuel.as_str().to_string());
    }

    if let Some(station) = tokens
        .windows(2)
        .find(|pair| {
            matches!(pair[0].as_str(), "station" | "st")
                && pair[1].chars().any(|c| c.is_ascii_digit())
        })
        .map(|pair| pair[1].clone())
    {
        entities.insert(STATION_ENTITY.to_string(), station);
    }

    entities
}

fn starts_follow_up(tokens: &[String]) -> bool {
    match tokens {
        [first, ..] if FOLLOW_UP_MARKERS.contains(&first.as_str()) => true,
        [first, second, ..] => {
            matches!(first.as_str(), "what" | "how") && second == "about"
        }
        _ => false,
    }
}

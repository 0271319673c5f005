//! Short-lived conversational context used to resolve follow-up queries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::Timestamp;
use crate::domain::nlp::{Classification, Entities, Intent};

/// Default lifetime of conversational context.
pub const DEFAULT_CONTEXT_TTL: Duration = Duration::from_secs(300);

/// New intent/entities to merge into the context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextUpdate {
    pub intent: Option<Intent>,
    pub entities: Entities,
}

impl ContextUpdate {
    /// Creates a new context update.
    pub fn new(intent: Option<Intent>, entities: Entities) -> Self {
        Self { intent, entities }
    }
}

impl From<&Classification> for ContextUpdate {
    fn from(classification: &Classification) -> Self {
        let intent = match classification.intent {
            Intent::Unknown => None,
            other => Some(other),
        };
        Self::new(intent, classification.entities.clone())
    }
}

/// Last recognised intent and entities, plus the values they replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    intent: Option<Intent>,
    #[serde(default)]
    entities: Entities,
    /// Intent that was current before the most recent merge.
    last_intent: Option<Intent>,
    /// Entities that were current before the most recent merge.
    #[serde(default)]
    last_entities: Entities,
    updated_at: Timestamp,
}

impl ConversationContext {
    /// Creates a fresh context from a single update.
    pub fn from_update(update: ContextUpdate, now: Timestamp) -> Self {
        Self {
            intent: update.intent,
            entities: update.entities,
            last_intent: None,
            last_entities: Entities::new(),
            updated_at: now,
        }
    }

    /// Merges an update into this context.
    ///
    /// The current intent/entities move to `last_intent`/`last_entities`.
    /// Entities are a shallow union where the update wins on conflicts; an
    /// update without an intent keeps the current one.
    pub fn merge(&mut self, update: ContextUpdate, now: Timestamp) {
        self.last_intent = self.intent;
        self.last_entities = self.entities.clone();

        if update.intent.is_some() {
            self.intent = update.intent;
        }
        self.entities.extend(update.entities);
        self.updated_at = now;
    }

    /// True iff strictly more than `ttl` has passed since the last update.
    pub fn is_expired(&self, now: Timestamp, ttl: Duration) -> bool {
        now.exceeds_ttl_since(&self.updated_at, ttl)
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn last_intent(&self) -> Option<Intent> {
        self.last_intent
    }

    pub fn last_entities(&self) -> &Entities {
        &self.last_entities
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::nlp::{FUEL_TYPE_ENTITY, STATION_ENTITY};

    fn entities(pairs: &[(&str, &str)]) -> Entities {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::from_unix_secs(1_000 + secs)
    }

    #[test]
    fn merge_preserves_previous_intent() {
        let mut ctx = ConversationContext::from_update(
            ContextUpdate::new(Some(Intent::PriceQuery), entities(&[(FUEL_TYPE_ENTITY, "premium")])),
            t(0),
        );

        ctx.merge(
            ContextUpdate::new(Some(Intent::StationList), Entities::new()),
            t(10),
        );

        assert_eq!(ctx.intent(), Some(Intent::StationList));
        assert_eq!(ctx.last_intent(), Some(Intent::PriceQuery));
        assert_eq!(
            ctx.last_entities().get(FUEL_TYPE_ENTITY),
            Some(&"premium".to_string())
        );
        assert_eq!(ctx.updated_at(), t(10));
    }

    #[test]
    fn merge_is_shallow_union_with_new_values_winning() {
        let mut ctx = ConversationContext::from_update(
            ContextUpdate::new(
                Some(Intent::PriceQuery),
                entities(&[(FUEL_TYPE_ENTITY, "premium"), (STATION_ENTITY, "12")]),
            ),
            t(0),
        );

        ctx.merge(
            ContextUpdate::new(None, entities(&[(FUEL_TYPE_ENTITY, "regular")])),
            t(5),
        );

        assert_eq!(ctx.intent(), Some(Intent::PriceQuery));
        assert_eq!(ctx.entities().get(FUEL_TYPE_ENTITY), Some(&"regular".to_string()));
        assert_eq!(ctx.entities().get(STATION_ENTITY), Some(&"12".to_string()));
    }

    #[test]
    fn expiry_is_strictly_greater_than_ttl() {
        let ctx = ConversationContext::from_update(ContextUpdate::default(), t(0));
        let ttl = Duration::from_secs(300);

        assert!(!ctx.is_expired(t(300), ttl));
        assert!(ctx.is_expired(t(301), ttl));
    }

    #[test]
    fn unknown_classification_carries_no_intent() {
        let classification = Classification::new(Intent::Unknown, Entities::new(), 0.0);
        let update = ContextUpdate::from(&classification);
        assert!(update.intent.is_none());
    }
}

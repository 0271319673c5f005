//! Natural-language vocabulary: intents, entities, fuel types, and the
//! deterministic local classifier used as a fallback.

mod intent;
mod local;

pub use intent::{
    Classification, Entities, FuelType, Intent, FUEL_TYPE_ENTITY, STATION_ENTITY,
};
pub use local::{resolve_follow_up, LocalClassifier, FOLLOW_UP_CONFIDENCE, KEYWORD_CONFIDENCE};

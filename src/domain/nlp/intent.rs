//! Intent and entity vocabulary shared by the remote classifier and the
//! local fallback.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Entities extracted from an utterance, keyed by entity name.
///
/// Ordered so that serialized payloads and log lines are deterministic.
pub type Entities = BTreeMap<String, String>;

/// Entity key holding a [`FuelType`].
pub const FUEL_TYPE_ENTITY: &str = "fuel_type";

/// Entity key holding a station identifier.
pub const STATION_ENTITY: &str = "station";

/// What the user is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PriceQuery,
    StationList,
    Settings,
    Stats,
    Unsubscribe,
    Help,
    Greeting,
    /// Utterance that only makes sense against the prior context.
    FollowUp,
    Unknown,
}

impl Intent {
    /// Returns the wire name of the intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::PriceQuery => "price_query",
            Intent::StationList => "station_list",
            Intent::Settings => "settings",
            Intent::Stats => "stats",
            Intent::Unsubscribe => "unsubscribe",
            Intent::Help => "help",
            Intent::Greeting => "greeting",
            Intent::FollowUp => "follow_up",
            Intent::Unknown => "unknown",
        }
    }

    /// Parses a wire name leniently; anything unrecognised is `Unknown`.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Intent::Unknown)
    }

    /// Returns true when the intent has to be resolved against prior context.
    pub fn needs_context(&self) -> bool {
        matches!(self, Intent::FollowUp | Intent::Unknown)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Intent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price_query" => Ok(Intent::PriceQuery),
            "station_list" => Ok(Intent::StationList),
            "settings" => Ok(Intent::Settings),
            "stats" => Ok(Intent::Stats),
            "unsubscribe" => Ok(Intent::Unsubscribe),
            "help" => Ok(Intent::Help),
            "greeting" => Ok(Intent::Greeting),
            "follow_up" => Ok(Intent::FollowUp),
            "unknown" => Ok(Intent::Unknown),
            other => Err(ValidationError::invalid_format(
                "intent",
                format!("unrecognised intent '{}'", other),
            )),
        }
    }
}

/// Fuel grades the product tracks prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Regular,
    Premium,
    Diesel,
    Ethanol,
}

impl FuelType {
    /// All fuel types in display order.
    pub const ALL: [FuelType; 4] = [
        FuelType::Regular,
        FuelType::Premium,
        FuelType::Diesel,
        FuelType::Ethanol,
    ];

    /// Returns the canonical name of the fuel type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Regular => "regular",
            FuelType::Premium => "premium",
            FuelType::Diesel => "diesel",
            FuelType::Ethanol => "ethanol",
        }
    }

    /// Returns a human-friendly label.
    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Regular => "Regular",
            FuelType::Premium => "Premium",
            FuelType::Diesel => "Diesel",
            FuelType::Ethanol => "Ethanol",
        }
    }

    /// Matches a single lowercase token against fuel names and aliases.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "regular" | "unleaded" | "gasoline" | "petrol" => Some(FuelType::Regular),
            "premium" | "super" | "plus" => Some(FuelType::Premium),
            "diesel" => Some(FuelType::Diesel),
            "ethanol" | "e85" => Some(FuelType::Ethanol),
            _ => None,
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::from_token(&s.trim().to_ascii_lowercase()).ok_or_else(|| {
            ValidationError::invalid_format("fuel_type", format!("unknown fuel type '{}'", s))
        })
    }
}

/// Result of classifying one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    #[serde(default)]
    pub entities: Entities,
    /// Classifier confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

impl Classification {
    /// Creates a classification, clamping confidence into `[0.0, 1.0]`.
    pub fn new(intent: Intent, entities: Entities, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            intent,
            entities,
            confidence,
        }
    }

    /// Returns the fuel type entity, if present and valid.
    pub fn fuel_type(&self) -> Option<FuelType> {
        self.entities
            .get(FUEL_TYPE_ENTITY)
            .and_then(|value| value.parse().ok())
    }
}

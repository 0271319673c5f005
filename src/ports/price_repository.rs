//! Price Repository Port - narrow queries against the price/alert store.
//!
//! Price computation and the store's schema live elsewhere; the bot only
//! needs these calls and a way to tell "absent" from "failing".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserKey};
use crate::domain::nlp::FuelType;
use crate::domain::wizard::NotificationPreferences;

/// Current price of one fuel at one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPrice {
    pub station_id: String,
    pub station_name: String,
    pub fuel_type: FuelType,
    pub price: f64,
    pub updated_at: Timestamp,
}

/// A station the user follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub region: String,
}

/// Aggregate figures shown by the stats command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub fuel_type: FuelType,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub samples: u32,
}

/// Errors from the price store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transient failure talking to the store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Port for price, station and preference data.
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Current prices, optionally restricted to one fuel type.
    async fn current_prices(&self, fuel: Option<FuelType>) -> Result<Vec<FuelPrice>, StoreError>;

    /// Stations the user has registered.
    async fn user_stations(&self, user: &UserKey) -> Result<Vec<Station>, StoreError>;

    /// Persists alert preferences from the settings wizard.
    async fn save_notification_preferences(
        &self,
        user: &UserKey,
        preferences: &NotificationPreferences,
    ) -> Result<(), StoreError>;

    /// Turns off all alerts for the user. `NotFound` if none were set.
    async fn disable_alerts(&self, user: &UserKey) -> Result<(), StoreError>;

    /// Per-fuel aggregate statistics.
    async fn stats(&self) -> Result<Vec<PriceStats>, StoreError>;
}

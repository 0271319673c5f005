//! In-memory price store.
//!
//! Backs the price repository port for development, the console
//! transport, and tests. Statistics are computed over the current prices.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{Timestamp, UserKey};
use crate::domain::nlp::FuelType;
use crate::domain::wizard::NotificationPreferences;
use crate::ports::{FuelPrice, PriceRepository, PriceStats, Station, StoreError};

/// In-memory implementation of [`PriceRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceRepository {
    prices: Arc<RwLock<Vec<FuelPrice>>>,
    stations: Arc<RwLock<HashMap<UserKey, Vec<Station>>>>,
    preferences: Arc<RwLock<HashMap<UserKey, NotificationPreferences>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPriceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository seeded with a few stations and prices.
    pub fn with_sample_data(now: Timestamp) -> Self {
        let samples = [
            ("st-1", "Harbour Road", FuelType::Regular, 1.689),
            ("st-1", "Harbour Road", FuelType::Premium, 1.849),
            ("st-1", "Harbour Road", FuelType::Diesel, 1.759),
            ("st-2", "Ring Junction", FuelType::Regular, 1.659),
            ("st-2", "Ring Junction", FuelType::Premium, 1.819),
            ("st-2", "Ring Junction", FuelType::Ethanol, 1.399),
            ("st-3", "Airport Service", FuelType::Diesel, 1.799),
        ];
        let prices = samples
            .iter()
            .map(|(id, name, fuel, price)| FuelPrice {
                station_id: id.to_string(),
                station_name: name.to_string(),
                fuel_type: *fuel,
                price: *price,
                updated_at: now,
            })
            .collect();
        Self {
            prices: Arc::new(RwLock::new(prices)),
            ..Self::default()
        }
    }

    pub async fn set_prices(&self, prices: Vec<FuelPrice>) {
        *self.prices.write().await = prices;
    }

    pub async fn add_station(&self, user: &UserKey, station: Station) {
        self.stations
            .write()
            .await
            .entry(user.clone())
            .or_default()
            .push(station);
    }

    /// Saved preferences for a user.
    pub async fn preferences_for(&self, user: &UserKey) -> Option<NotificationPreferences> {
        self.preferences.read().await.get(user).cloned()
    }

    /// Simulates a store outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("price store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PriceRepository for InMemoryPriceRepository {
    async fn current_prices(&self, fuel: Option<FuelType>) -> Result<Vec<FuelPrice>, StoreError> {
        self.check_available()?;
        let prices = self.prices.read().await;
        let mut selected: Vec<FuelPrice> = prices
            .iter()
            .filter(|p| fuel.map_or(true, |f| p.fuel_type == f))
            .cloned()
            .collect();
        selected.sort_by(|a, b| {
            a.fuel_type
                .cmp(&b.fuel_type)
                .then(a.price.total_cmp(&b.price))
        });
        Ok(selected)
    }

    async fn user_stations(&self, user: &UserKey) -> Result<Vec<Station>, StoreError> {
        self.check_available()?;
        Ok(self
            .stations
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_notification_preferences(
        &self,
        user: &UserKey,
        preferences: &NotificationPreferences,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.preferences
            .write()
            .await
            .insert(user.clone(), preferences.clone());
        Ok(())
    }

    async fn disable_alerts(&self, user: &UserKey) -> Result<(), StoreError> {
        self.check_available()?;
        match self.preferences.write().await.remove(user) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("no alerts for {}", user))),
        }
    }

    async fn stats(&self) -> Result<Vec<PriceStats>, StoreError> {
        self.check_available()?;
        let prices = self.prices.read().await;
        let stats = FuelType::ALL
            .iter()
            .filter_map(|fuel| {
                let values: Vec<f64> = prices
                    .iter()
                    .filter(|p| p.fuel_type == *fuel)
                    .map(|p| p.price)
                    .collect();
                if values.is_empty() {
                    return None;
                }
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let average = values.iter().sum::<f64>() / values.len() as f64;
                Some(PriceStats {
                    fuel_type: *fuel,
                    min,
                    max,
                    average,
                    samples: values.len() as u32,
                })
            })
            .collect();
        Ok(stats)
    }
}

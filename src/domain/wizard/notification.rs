//! Notification settings: step input parsing and the completed preferences.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::definition::NotificationStep;
use super::state::WizardData;
use crate::domain::foundation::ValidationError;
use crate::domain::nlp::FuelType;

const MAX_REGION_LEN: usize = 64;

/// How often alerts are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFrequency {
    Instant,
    Daily,
    Weekly,
}

impl AlertFrequency {
    pub const ALL: [AlertFrequency; 3] = [
        AlertFrequency::Instant,
        AlertFrequency::Daily,
        AlertFrequency::Weekly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::Instant => "instant",
            AlertFrequency::Daily => "daily",
            AlertFrequency::Weekly => "weekly",
        }
    }
}

impl fmt::Display for AlertFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertFrequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instant" | "immediately" => Ok(AlertFrequency::Instant),
            "daily" => Ok(AlertFrequency::Daily),
            "weekly" => Ok(AlertFrequency::Weekly),
            other => Err(ValidationError::invalid_format(
                "frequency",
                format!("expected instant, daily or weekly, got '{}'", other),
            )),
        }
    }
}

/// Preferences produced by a completed notification wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub fuel_types: Vec<FuelType>,
    pub region: String,
    pub price_threshold: f64,
    /// Local time of day, `HH:MM`.
    pub alert_time: String,
    pub frequency: AlertFrequency,
}

impl NotificationPreferences {
    /// Builds preferences from a completed wizard's data map.
    pub fn from_data(data: &WizardData) -> Result<Self, ValidationError> {
        let fuel_types = data
            .get(NotificationStep::FuelTypes.field())
            .and_then(Value::as_array)
            .ok_or_else(|| ValidationError::empty_field("fuel_types"))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::parse::<FuelType>)
            .collect::<Result<Vec<_>, _>>()?;
        if fuel_types.is_empty() {
            return Err(ValidationError::empty_field("fuel_types"));
        }

        let region = string_field(data, NotificationStep::Region)?;
        let price_threshold = data
            .get(NotificationStep::PriceThreshold.field())
            .and_then(Value::as_f64)
            .ok_or_else(|| ValidationError::empty_field("price_threshold"))?;
        let alert_time = string_field(data, NotificationStep::AlertTime)?;
        let frequency = string_field(data, NotificationStep::Frequency)?.parse()?;

        Ok(Self {
            fuel_types,
            region,
            price_threshold,
            alert_time,
            frequency,
        })
    }
}

fn string_field(data: &WizardData, step: NotificationStep) -> Result<String, ValidationError> {
    data.get(step.field())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::empty_field(step.field()))
}

/// Parses free-text input for a single-value step into the value stored
/// under the step's field.
///
/// The fuel types step is driven by toggles, not text, so it rejects input.
pub fn parse_step_input(step: NotificationStep, input: &str) -> Result<Value, ValidationError> {
    let input = input.trim();
    match step {
        NotificationStep::FuelTypes => Err(ValidationError::invalid_format(
            "fuel_types",
            "choose fuel types with the buttons",
        )),
        NotificationStep::Region => parse_region(input).map(Value::from),
        NotificationStep::PriceThreshold => parse_price_threshold(input).map(Value::from),
        NotificationStep::AlertTime => parse_alert_time(input).map(Value::from),
        NotificationStep::Frequency => input
            .parse::<AlertFrequency>()
            .map(|f| Value::from(f.as_str())),
    }
}

fn parse_region(input: &str) -> Result<String, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::empty_field("region"));
    }
    let len = input.chars().count();
    if len > MAX_REGION_LEN {
        return Err(ValidationError::out_of_range(
            "region",
            1,
            MAX_REGION_LEN as i64,
            len as i64,
        ));
    }
    Ok(input.to_string())
}

/// Accepts `1.85`, `1,85` and a leading currency sign.
fn parse_price_threshold(input: &str) -> Result<f64, ValidationError> {
    let cleaned = input.trim_start_matches(['$', '€', '£']).replace(',', ".");
    let value: f64 = cleaned.trim().parse().map_err(|_| {
        ValidationError::invalid_format("price_threshold", format!("'{}' is not a number", input))
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::invalid_format(
            "price_threshold",
            "must be a positive amount",
        ));
    }
    Ok(value)
}

/// Normalises `H:MM`/`HH:MM` to `HH:MM`.
fn parse_alert_time(input: &str) -> Result<String, ValidationError> {
    let bad_format = || ValidationError::invalid_format("alert_time", "expected HH:MM");
    let (hours, minutes) = input.split_once(':').ok_or_else(bad_format)?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(bad_format());
    }
    let hours: i64 = hours.parse().map_err(|_| bad_format())?;
    let minutes: i64 = minutes.parse().map_err(|_| bad_format())?;
    if !(0..=23).contains(&hours) {
        return Err(ValidationError::out_of_range("alert_time.hours", 0, 23, hours));
    }
    if !(0..=59).contains(&minutes) {
        return Err(ValidationError::out_of_range("alert_time.minutes", 0, 59, minutes));
    }
    Ok(format!("{:02}:{:02}", hours, minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_data() -> WizardData {
        let mut data = WizardData::new();
        data.insert("fuel_types".into(), json!(["diesel", "premium"]));
        data.insert("region".into(), json!("North"));
        data.insert("price_threshold".into(), json!(1.85));
        data.insert("alert_time".into(), json!("07:30"));
        data.insert("frequency".into(), json!("daily"));
        data
    }

    #[test]
    fn preferences_built_from_complete_data() {
        let prefs = NotificationPreferences::from_data(&complete_data()).unwrap();
        assert_eq!(prefs.fuel_types, vec![FuelType::Diesel, FuelType::Premium]);
        assert_eq!(prefs.region, "North");
        assert_eq!(prefs.price_threshold, 1.85);
        assert_eq!(prefs.alert_time, "07:30");
        assert_eq!(prefs.frequency, AlertFrequency::Daily);
    }

    #[test]
    fn preferences_reject_missing_field() {
        let mut data = complete_data();
        data.remove("alert_time");
        assert_eq!(
            NotificationPreferences::from_data(&data),
            Err(ValidationError::empty_field("alert_time"))
        );
    }

    #[test]
    fn price_threshold_accepts_comma_and_currency() {
        assert_eq!(
            parse_step_input(NotificationStep::PriceThreshold, "$1,75").unwrap(),
            json!(1.75)
        );
        assert!(parse_step_input(NotificationStep::PriceThreshold, "-2").is_err());
        assert!(parse_step_input(NotificationStep::PriceThreshold, "cheap").is_err());
    }

    #[test]
    fn alert_time_is_normalised_and_bounded() {
        assert_eq!(
            parse_step_input(NotificationStep::AlertTime, "7:05").unwrap(),
            json!("07:05")
        );
        assert!(parse_step_input(NotificationStep::AlertTime, "24:00").is_err());
        assert!(parse_step_input(NotificationStep::AlertTime, "12:60").is_err());
        assert!(parse_step_input(NotificationStep::AlertTime, "noon").is_err());
    }

    #[test]
    fn frequency_and_region_parse() {
        assert_eq!(
            parse_step_input(NotificationStep::Frequency, " Weekly ").unwrap(),
            json!("weekly")
        );
        assert!(parse_step_input(NotificationStep::Frequency, "hourly").is_err());
        assert!(parse_step_input(NotificationStep::Region, "   ").is_err());
        assert!(parse_step_input(NotificationStep::FuelTypes, "diesel").is_err());
    }
}

//! Wizard state carried inside a conversation session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::definition::{NotificationSettingsWizard, WizardDefinition};
use crate::domain::foundation::{Timestamp, ValidationError};

/// Data accumulated across wizard steps, keyed by field name.
pub type WizardData = BTreeMap<String, serde_json::Value>;

/// Which wizard a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardKind {
    /// Five-step alert/notification configuration dialog.
    NotificationSettings,
}

impl WizardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardKind::NotificationSettings => "notification_settings",
        }
    }

    /// Returns the step table for this wizard.
    pub fn definition(&self) -> &'static dyn WizardDefinition {
        match self {
            WizardKind::NotificationSettings => &NotificationSettingsWizard,
        }
    }
}

impl fmt::Display for WizardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WizardKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notification_settings" => Ok(WizardKind::NotificationSettings),
            other => Err(ValidationError::invalid_format(
                "wizard",
                format!("unknown wizard '{}'", other),
            )),
        }
    }
}

/// Progress of one running wizard.
///
/// `current_step` is 1-based and only changes through the engine's
/// transition calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    kind: WizardKind,
    current_step: u8,
    #[serde(default)]
    data: WizardData,
    started_at: Timestamp,
}

impl WizardState {
    /// Creates a wizard positioned at step 1 with no data.
    pub fn new(kind: WizardKind, started_at: Timestamp) -> Self {
        Self {
            kind,
            current_step: 1,
            data: WizardData::new(),
            started_at,
        }
    }

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn data(&self) -> &WizardData {
        &self.data
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Total number of steps for this wizard.
    pub fn step_count(&self) -> u8 {
        self.kind.definition().step_count()
    }

    pub fn is_at_final_step(&self) -> bool {
        self.current_step >= self.step_count()
    }

    pub(super) fn set_step(&mut self, step: u8) {
        self.current_step = step;
    }

    pub(super) fn data_mut(&mut self) -> &mut WizardData {
        &mut self.data
    }

    pub(super) fn into_data(self) -> WizardData {
        self.data
    }
}

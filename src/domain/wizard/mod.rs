//! Multi-step wizards.
//!
//! - `WizardEngine` - generic step sequencing over a session
//! - `WizardDefinition` - per-wizard transition table
//! - `notification` - the notification settings wizard's input rules

mod definition;
mod engine;
mod errors;
mod notification;
mod state;

pub use definition::{NotificationSettingsWizard, NotificationStep, WizardDefinition};
pub use engine::{WizardEngine, DEFAULT_WIZARD_TTL};
pub use errors::WizardError;
pub use notification::{parse_step_input, AlertFrequency, NotificationPreferences};
pub use state::{WizardData, WizardKind, WizardState};

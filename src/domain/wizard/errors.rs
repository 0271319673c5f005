//! Wizard engine errors.

use thiserror::Error;

use super::state::WizardKind;

/// Errors raised by wizard transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("no wizard is active")]
    NoActiveWizard,

    #[error("wizard '{active}' is already active")]
    AlreadyActive { active: WizardKind },

    #[error("cannot advance past final step {step}; complete the wizard instead")]
    FinalStep { step: u8 },

    #[error("wizard is at step {current} of {total}; it can only be completed at the final step")]
    NotAtFinalStep { current: u8, total: u8 },

    #[error("field '{field}' is not a multi-select list")]
    NotMultiSelect { field: String },
}

//! Wizard definitions: named steps and their transition tables.

use super::state::WizardKind;

/// Sequencing rules for one wizard type.
///
/// The engine consults the definition for step bounds and neighbours; it
/// knows nothing about what a step means.
pub trait WizardDefinition: Send + Sync {
    /// The wizard this definition describes.
    fn kind(&self) -> WizardKind;

    /// Number of steps (`N`). Steps are numbered `1..=N`.
    fn step_count(&self) -> u8;

    /// Name of a step, `None` when out of bounds.
    fn step_name(&self, step: u8) -> Option<&'static str>;

    /// Step reached by advancing from `step`, `None` at the final step.
    fn next_step(&self, step: u8) -> Option<u8>;

    /// Step reached by going back from `step`, `None` at step 1.
    fn previous_step(&self, step: u8) -> Option<u8>;
}

/// Steps of the notification settings wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationStep {
    FuelTypes,
    Region,
    PriceThreshold,
    AlertTime,
    Frequency,
}

/// Transition table: `(step, next, back)`.
const NOTIFICATION_TRANSITIONS: [(NotificationStep, Option<NotificationStep>, Option<NotificationStep>); 5] = [
    (NotificationStep::FuelTypes, Some(NotificationStep::Region), None),
    (NotificationStep::Region, Some(NotificationStep::PriceThreshold), Some(NotificationStep::FuelTypes)),
    (NotificationStep::PriceThreshold, Some(NotificationStep::AlertTime), Some(NotificationStep::Region)),
    (NotificationStep::AlertTime, Some(NotificationStep::Frequency), Some(NotificationStep::PriceThreshold)),
    (NotificationStep::Frequency, None, Some(NotificationStep::AlertTime)),
];

impl NotificationStep {
    /// 1-based position of the step.
    pub fn index(&self) -> u8 {
        match self {
            NotificationStep::FuelTypes => 1,
            NotificationStep::Region => 2,
            NotificationStep::PriceThreshold => 3,
            NotificationStep::AlertTime => 4,
            NotificationStep::Frequency => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        NOTIFICATION_TRANSITIONS
            .iter()
            .map(|(step, _, _)| *step)
            .find(|step| step.index() == index)
    }

    /// Data key written by this step.
    pub fn field(&self) -> &'static str {
        match self {
            NotificationStep::FuelTypes => "fuel_types",
            NotificationStep::Region => "region",
            NotificationStep::PriceThreshold => "price_threshold",
            NotificationStep::AlertTime => "alert_time",
            NotificationStep::Frequency => "frequency",
        }
    }

    fn transitions(&self) -> (Option<NotificationStep>, Option<NotificationStep>) {
        NOTIFICATION_TRANSITIONS
            .iter()
            .find(|(step, _, _)| step == self)
            .map(|(_, next, back)| (*next, *back))
            .unwrap_or((None, None))
    }
}

/// Definition of the notification settings wizard.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationSettingsWizard;

impl WizardDefinition for NotificationSettingsWizard {
    fn kind(&self) -> WizardKind {
        WizardKind::NotificationSettings
    }

    fn step_count(&self) -> u8 {
        NOTIFICATION_TRANSITIONS.len() as u8
    }

    fn step_name(&self, step: u8) -> Option<&'static str> {
        NotificationStep::from_index(step).map(|s| s.field())
    }

    fn next_step(&self, step: u8) -> Option<u8> {
        NotificationStep::from_index(step)
            .and_then(|s| s.transitions().0)
            .map(|s| s.index())
    }

    fn previous_step(&self, step: u8) -> Option<u8> {
        NotificationStep::from_index(step)
            .and_then(|s| s.transitions().1)
            .map(|s| s.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_linear_over_five_steps() {
        let def = NotificationSettingsWizard;
        assert_eq!(def.step_count(), 5);
        for step in 1..5 {
            assert_eq!(def.next_step(step), Some(step + 1));
            assert_eq!(def.previous_step(step + 1), Some(step));
        }
        assert_eq!(def.next_step(5), None);
        assert_eq!(def.previous_step(1), None);
    }

    #[test]
    fn out_of_bounds_steps_have_no_neighbours() {
        let def = NotificationSettingsWizard;
        assert_eq!(def.step_name(0), None);
        assert_eq!(def.step_name(6), None);
        assert_eq!(def.next_step(9), None);
    }

    #[test]
    fn step_indices_round_trip() {
        for index in 1..=5 {
            let step = NotificationStep::from_index(index).unwrap();
            assert_eq!(step.index(), index);
        }
        assert_eq!(NotificationStep::from_index(3).unwrap().field(), "price_threshold");
    }
}

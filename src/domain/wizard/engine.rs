//! Generic wizard engine.
//!
//! Sequences a wizard's steps over the session's `active_wizard` slot. The
//! engine knows step bounds and neighbours through [`WizardDefinition`]
//! only; what a step means is up to the caller.

use serde_json::Value;
use std::time::Duration;

use super::errors::WizardError;
use super::state::{WizardData, WizardKind, WizardState};
use crate::domain::foundation::Timestamp;
use crate::domain::session::ConversationSession;

/// Default time a wizard may stay open from its start.
pub const DEFAULT_WIZARD_TTL: Duration = Duration::from_secs(300);

/// Stateless wizard transition logic parameterised by the wizard TTL.
#[derive(Debug, Clone, Copy)]
pub struct WizardEngine {
    ttl: Duration,
}

impl Default for WizardEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WIZARD_TTL)
    }
}

impl WizardEngine {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a wizard at step 1 with empty data.
    ///
    /// Fails with `AlreadyActive` if any wizard is running; the caller
    /// must cancel it first.
    pub fn start<'a>(
        &self,
        session: &'a mut ConversationSession,
        kind: WizardKind,
        now: Timestamp,
    ) -> Result<&'a WizardState, WizardError> {
        if let Some(active) = session.active_wizard() {
            return Err(WizardError::AlreadyActive {
                active: active.kind(),
            });
        }
        session.set_active_wizard(WizardState::new(kind, now));
        session.touch(now);
        session.active_wizard().ok_or(WizardError::NoActiveWizard)
    }

    /// Merges `step_data` and moves to the next step. Returns the new step.
    ///
    /// At the final step nothing changes and `FinalStep` is returned.
    pub fn advance(
        &self,
        session: &mut ConversationSession,
        step_data: WizardData,
    ) -> Result<u8, WizardError> {
        let state = session
            .active_wizard_mut()
            .ok_or(WizardError::NoActiveWizard)?;
        let next = state
            .kind()
            .definition()
            .next_step(state.current_step())
            .ok_or(WizardError::FinalStep {
                step: state.current_step(),
            })?;
        state.data_mut().extend(step_data);
        state.set_step(next);
        Ok(next)
    }

    /// Merges `step_data` without changing the step.
    pub fn record(
        &self,
        session: &mut ConversationSession,
        step_data: WizardData,
    ) -> Result<(), WizardError> {
        let state = session
            .active_wizard_mut()
            .ok_or(WizardError::NoActiveWizard)?;
        state.data_mut().extend(step_data);
        Ok(())
    }

    /// Moves one step back, never below 1. Data is kept.
    pub fn back(&self, session: &mut ConversationSession) -> Result<u8, WizardError> {
        let state = session
            .active_wizard_mut()
            .ok_or(WizardError::NoActiveWizard)?;
        let previous = state
            .kind()
            .definition()
            .previous_step(state.current_step())
            .unwrap_or(1);
        state.set_step(previous);
        Ok(previous)
    }

    /// Drops the wizard without completion side effects.
    pub fn cancel(&self, session: &mut ConversationSession) -> Option<WizardState> {
        session.take_active_wizard()
    }

    /// Returns the accumulated data and clears the wizard.
    ///
    /// Only allowed at the final step; elsewhere the wizard is left as is.
    pub fn complete(&self, session: &mut ConversationSession) -> Result<WizardData, WizardError> {
        let state = session.active_wizard().ok_or(WizardError::NoActiveWizard)?;
        if !state.is_at_final_step() {
            return Err(WizardError::NotAtFinalStep {
                current: state.current_step(),
                total: state.step_count(),
            });
        }
        session
            .take_active_wizard()
            .map(WizardState::into_data)
            .ok_or(WizardError::NoActiveWizard)
    }

    /// True when strictly more than the TTL has passed since the start.
    pub fn is_timed_out(&self, state: &WizardState, now: Timestamp) -> bool {
        now.exceeds_ttl_since(&state.started_at(), self.ttl)
    }

    /// Cancels the active wizard if it has timed out, returning it.
    pub fn expire_if_timed_out(
        &self,
        session: &mut ConversationSession,
        now: Timestamp,
    ) -> Option<WizardState> {
        let timed_out = session
            .active_wizard()
            .is_some_and(|state| self.is_timed_out(state, now));
        if timed_out {
            self.cancel(session)
        } else {
            None
        }
    }

    /// Toggles `item` in the multi-select list stored under `field`.
    ///
    /// A selection never becomes empty: removing the only selected item
    /// puts it back. This keeps the step from reaching a state where the
    /// user cannot continue.
    pub fn toggle_selection(
        &self,
        session: &mut ConversationSession,
        field: &str,
        item: &str,
    ) -> Result<Vec<String>, WizardError> {
        let state = session
            .active_wizard_mut()
            .ok_or(WizardError::NoActiveWizard)?;

        let mut selected: Vec<String> = match state.data().get(field) {
            None => Vec::new(),
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(_) => {
                return Err(WizardError::NotMultiSelect {
                    field: field.to_string(),
                })
            }
        };

        if let Some(pos) = selected.iter().position(|s| s == item) {
            selected.remove(pos);
            if selected.is_empty() {
                selected.push(item.to_string());
            }
        } else {
            selected.push(item.to_string());
        }

        state.data_mut().insert(
            field.to_string(),
            Value::Array(selected.iter().cloned().map(Value::from).collect()),
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserKey;
    use proptest::prelude::*;
    use serde_json::json;

    fn t(secs: u64) -> Timestamp {
        Timestamp::from_unix_secs(50_000 + secs)
    }

    fn session() -> ConversationSession {
        ConversationSession::new(UserKey::new("tg:42").unwrap(), t(0))
    }

    fn entry(key: &str, value: Value) -> WizardData {
        let mut data = WizardData::new();
        data.insert(key.to_string(), value);
        data
    }

    fn started() -> (WizardEngine, ConversationSession) {
        let engine = WizardEngine::default();
        let mut s = session();
        engine
            .start(&mut s, WizardKind::NotificationSettings, t(0))
            .unwrap();
        (engine, s)
    }

    // ─── Start / cancel ──────────────────────────────────────────────

    #[test]
    fn start_creates_step_one() {
        let (_, s) = started();
        let state = s.active_wizard().unwrap();
        assert_eq!(state.current_step(), 1);
        assert!(state.data().is_empty());
        assert_eq!(state.started_at(), t(0));
    }

    #[test]
    fn start_fails_while_wizard_active() {
        let (engine, mut s) = started();
        let err = engine
            .start(&mut s, WizardKind::NotificationSettings, t(5))
            .unwrap_err();
        assert_eq!(
            err,
            WizardError::AlreadyActive {
                active: WizardKind::NotificationSettings
            }
        );
        assert_eq!(s.active_wizard().unwrap().started_at(), t(0));
    }

    #[test]
    fn cancel_clears_wizard() {
        let (engine, mut s) = started();
        assert!(engine.cancel(&mut s).is_some());
        assert!(s.active_wizard().is_none());
        assert!(engine.cancel(&mut s).is_none());
    }

    #[test]
    fn operations_without_wizard_fail() {
        let engine = WizardEngine::default();
        let mut s = session();
        assert_eq!(
            engine.advance(&mut s, WizardData::new()),
            Err(WizardError::NoActiveWizard)
        );
        assert_eq!(engine.back(&mut s), Err(WizardError::NoActiveWizard));
        assert_eq!(engine.complete(&mut s), Err(WizardError::NoActiveWizard));
    }

    // ─── Advance / back / complete ───────────────────────────────────

    #[test]
    fn advance_merges_and_increments() {
        let (engine, mut s) = started();
        assert_eq!(engine.advance(&mut s, entry("a", json!(1))).unwrap(), 2);
        assert_eq!(engine.advance(&mut s, entry("b", json!(2))).unwrap(), 3);

        let data = s.active_wizard().unwrap().data();
        assert_eq!(data.get("a"), Some(&json!(1)));
        assert_eq!(data.get("b"), Some(&json!(2)));
    }

    #[test]
    fn advance_at_final_step_is_rejected_without_changes() {
        let (engine, mut s) = started();
        for i in 0..4 {
            engine.advance(&mut s, entry(&format!("k{}", i), json!(i))).unwrap();
        }
        let before = s.active_wizard().unwrap().clone();

        assert_eq!(
            engine.advance(&mut s, entry("late", json!(true))),
            Err(WizardError::FinalStep { step: 5 })
        );
        assert_eq!(s.active_wizard().unwrap(), &before);
    }

    #[test]
    fn back_stops_at_one_and_keeps_data() {
        let (engine, mut s) = started();
        engine.advance(&mut s, entry("a", json!("x"))).unwrap();
        assert_eq!(engine.back(&mut s).unwrap(), 1);
        assert_eq!(engine.back(&mut s).unwrap(), 1);
        assert_eq!(s.active_wizard().unwrap().data().get("a"), Some(&json!("x")));
    }

    #[test]
    fn complete_before_final_step_is_rejected() {
        let (engine, mut s) = started();
        assert_eq!(
            engine.complete(&mut s),
            Err(WizardError::NotAtFinalStep { current: 1, total: 5 })
        );
        assert!(s.active_wizard().is_some());
    }

    #[test]
    fn complete_returns_data_and_clears() {
        let (engine, mut s) = started();
        for i in 0..4 {
            engine.advance(&mut s, entry(&format!("k{}", i), json!(i))).unwrap();
        }
        engine.record(&mut s, entry("k4", json!(4))).unwrap();

        let data = engine.complete(&mut s).unwrap();
        assert_eq!(data.len(), 5);
        assert!(s.active_wizard().is_none());
    }

    // ─── Timeout ─────────────────────────────────────────────────────

    #[test]
    fn timeout_is_strictly_after_ttl() {
        let (engine, s) = started();
        let state = s.active_wizard().unwrap();
        assert!(!engine.is_timed_out(state, t(300)));
        assert!(engine.is_timed_out(state, t(301)));
    }

    #[test]
    fn expire_if_timed_out_cancels_only_stale_wizards() {
        let (engine, mut s) = started();
        assert!(engine.expire_if_timed_out(&mut s, t(10)).is_none());
        assert!(s.has_active_wizard());

        assert!(engine.expire_if_timed_out(&mut s, t(1_000)).is_some());
        assert!(!s.has_active_wizard());
    }

    // ─── Multi-select ────────────────────────────────────────────────

    #[test]
    fn toggle_adds_and_removes() {
        let (engine, mut s) = started();
        assert_eq!(engine.toggle_selection(&mut s, "fuel_types", "diesel").unwrap(), vec!["diesel"]);
        assert_eq!(
            engine.toggle_selection(&mut s, "fuel_types", "premium").unwrap(),
            vec!["diesel", "premium"]
        );
        assert_eq!(engine.toggle_selection(&mut s, "fuel_types", "diesel").unwrap(), vec!["premium"]);
    }

    #[test]
    fn toggling_last_item_re_adds_it() {
        let (engine, mut s) = started();
        engine.toggle_selection(&mut s, "fuel_types", "diesel").unwrap();
        let selected = engine.toggle_selection(&mut s, "fuel_types", "diesel").unwrap();
        assert_eq!(selected, vec!["diesel"]);
        assert_eq!(
            s.active_wizard().unwrap().data().get("fuel_types"),
            Some(&json!(["diesel"]))
        );
    }

    #[test]
    fn toggle_on_scalar_field_is_rejected() {
        let (engine, mut s) = started();
        engine.record(&mut s, entry("region", json!("North"))).unwrap();
        assert_eq!(
            engine.toggle_selection(&mut s, "region", "x"),
            Err(WizardError::NotMultiSelect {
                field: "region".to_string()
            })
        );
    }

    // ─── Properties ──────────────────────────────────────────────────

    #[derive(Debug, Clone)]
    enum Op {
        Advance,
        Back,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Advance), Just(Op::Back)]
    }

    proptest! {
        #[test]
        fn data_is_never_lost_across_advance_and_back(ops in prop::collection::vec(op(), 0..40)) {
            let (engine, mut s) = started();
            let mut written = Vec::new();

            for (i, op) in ops.iter().enumerate() {
                match op {
                    Op::Advance => {
                        let key = format!("field_{}", i);
                        if engine.advance(&mut s, entry(&key, json!(i))).is_ok() {
                            written.push((key, i));
                        }
                    }
                    Op::Back => {
                        engine.back(&mut s).unwrap();
                    }
                }

                let state = s.active_wizard().unwrap();
                prop_assert!((1..=5).contains(&state.current_step()));
                for (key, value) in &written {
                    let expected = json!(value);
                    prop_assert_eq!(state.data().get(key), Some(&expected));
                }
            }
        }

        #[test]
        fn multi_select_never_becomes_empty(
            toggles in prop::collection::vec(prop::sample::select(vec!["regular", "premium", "diesel", "ethanol"]), 1..30)
        ) {
            let (engine, mut s) = started();
            for item in toggles {
                let selected = engine.toggle_selection(&mut s, "fuel_types", item).unwrap();
                prop_assert!(!selected.is_empty());
            }
        }
    }
}

//! Step handling for the notification settings wizard.
//!
//! The engine only sequences steps; this module knows what each step asks,
//! which buttons it shows, and how its input is parsed. Control words
//! (`next`, `back`, `cancel`) arrive as button payloads or typed text.

use serde_json::Value;

use super::handlers::{CommandContext, HandlerError};
use crate::domain::messaging::{Button, Keyboard, OutboundMessage};
use crate::domain::nlp::FuelType;
use crate::domain::wizard::{
    parse_step_input, AlertFrequency, NotificationPreferences, NotificationStep, WizardData,
    WizardKind, WizardState,
};

/// Payload prefix of the fuel type toggle buttons.
pub const TOGGLE_PREFIX: &str = "toggle:";

const NEXT: &str = "next";
const BACK: &str = "back";
const CANCEL: &str = "cancel";

fn control_word(input: &str) -> Option<&'static str> {
    match input.trim().trim_start_matches('/').to_ascii_lowercase().as_str() {
        NEXT => Some(NEXT),
        BACK => Some(BACK),
        CANCEL => Some(CANCEL),
        _ => None,
    }
}

fn selected_fuels(state: &WizardState) -> Vec<String> {
    state
        .data()
        .get(NotificationStep::FuelTypes.field())
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn navigation_row(include_back: bool) -> Vec<Button> {
    let mut row = Vec::new();
    if include_back {
        row.push(Button::new("Back", BACK));
    }
    row.push(Button::new("Cancel", CANCEL));
    row
}

/// Question and buttons for the wizard's current step.
pub fn prompt(state: &WizardState) -> OutboundMessage {
    let total = state.step_count();
    let current = state.current_step();
    let header = format!("Step {}/{}", current, total);

    match NotificationStep::from_index(current) {
        Some(NotificationStep::FuelTypes) => {
            let selected = selected_fuels(state);
            let toggles = FuelType::ALL
                .iter()
                .map(|fuel| {
                    let mark = if selected.iter().any(|s| s == fuel.as_str()) {
                        "[x] "
                    } else {
                        "[ ] "
                    };
                    Button::new(
                        format!("{}{}", mark, fuel.label()),
                        format!("{}{}", TOGGLE_PREFIX, fuel.as_str()),
                    )
                })
                .collect();
            OutboundMessage::text(format!(
                "{}: Which fuels should alerts cover? Tap to select, then Next.",
                header
            ))
            .with_keyboard(
                Keyboard::new()
                    .row(toggles)
                    .row(vec![Button::new("Next", NEXT)])
                    .row(navigation_row(false)),
            )
        }
        Some(NotificationStep::Region) => OutboundMessage::text(format!(
            "{}: Which region should we watch? Type its name.",
            header
        ))
        .with_keyboard(Keyboard::new().row(navigation_row(true))),
        Some(NotificationStep::PriceThreshold) => OutboundMessage::text(format!(
            "{}: Alert me when the price drops below... (e.g. 1.75)",
            header
        ))
        .with_keyboard(Keyboard::new().row(navigation_row(true))),
        Some(NotificationStep::AlertTime) => OutboundMessage::text(format!(
            "{}: What time should alerts arrive? (HH:MM)",
            header
        ))
        .with_keyboard(Keyboard::new().row(navigation_row(true))),
        Some(NotificationStep::Frequency) => {
            let options = AlertFrequency::ALL
                .iter()
                .map(|f| Button::new(capitalize(f.as_str()), f.as_str()))
                .collect();
            OutboundMessage::text(format!("{}: How often should we alert you?", header))
                .with_keyboard(Keyboard::new().row(options).row(navigation_row(true)))
        }
        None => OutboundMessage::text(header),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Routes one input to the active wizard.
pub async fn handle_input(
    ctx: &mut CommandContext<'_>,
    input: &str,
) -> Result<Vec<OutboundMessage>, HandlerError> {
    let state = ctx
        .session
        .active_wizard()
        .ok_or_else(|| HandlerError::Internal("no active wizard".to_string()))?;
    match state.kind() {
        WizardKind::NotificationSettings => notification_input(ctx, input).await,
    }
}

async fn notification_input(
    ctx: &mut CommandContext<'_>,
    input: &str,
) -> Result<Vec<OutboundMessage>, HandlerError> {
    let wizards = &ctx.deps.wizards;

    match control_word(input) {
        Some(CANCEL) => {
            wizards.cancel(ctx.session);
            return Ok(vec![OutboundMessage::text(
                "Setup cancelled. Nothing was changed.",
            )]);
        }
        Some(BACK) => {
            wizards.back(ctx.session)?;
            return Ok(vec![current_prompt(ctx)?]);
        }
        _ => {}
    }

    let current = ctx
        .session
        .active_wizard()
        .map(WizardState::current_step)
        .ok_or_else(|| HandlerError::Internal("no active wizard".to_string()))?;
    let step = NotificationStep::from_index(current)
        .ok_or_else(|| HandlerError::Internal(format!("step {} out of bounds", current)))?;

    if input.trim_start().starts_with('/') {
        return Err(HandlerError::InvalidInput(
            "You're setting up alerts. Answer the question above, or send cancel to stop."
                .to_string(),
        ));
    }

    if step == NotificationStep::FuelTypes {
        return fuel_types_input(ctx, input);
    }

    if control_word(input) == Some(NEXT) {
        return Err(HandlerError::InvalidInput(
            "Please answer the question above first.".to_string(),
        ));
    }

    let value = parse_step_input(step, input)?;
    let mut step_data = WizardData::new();
    step_data.insert(step.field().to_string(), value);

    if step == NotificationStep::Frequency {
        wizards.record(ctx.session, step_data)?;
        let data = wizards.complete(ctx.session)?;
        let preferences = NotificationPreferences::from_data(&data)
            .map_err(|err| HandlerError::Internal(format!("completed wizard data invalid: {}", err)))?;
        ctx.deps
            .prices
            .save_notification_preferences(ctx.session.user_key(), &preferences)
            .await?;
        return Ok(vec![OutboundMessage::text(summary(&preferences))]);
    }

    wizards.advance(ctx.session, step_data)?;
    Ok(vec![current_prompt(ctx)?])
}

fn fuel_types_input(
    ctx: &mut CommandContext<'_>,
    input: &str,
) -> Result<Vec<OutboundMessage>, HandlerError> {
    let wizards = &ctx.deps.wizards;
    let field = NotificationStep::FuelTypes.field();

    if let Some(token) = input.trim().strip_prefix(TOGGLE_PREFIX) {
        let fuel: FuelType = token.parse()?;
        wizards.toggle_selection(ctx.session, field, fuel.as_str())?;
        return Ok(vec![current_prompt(ctx)?]);
    }

    if control_word(input) == Some(NEXT) {
        let has_selection = ctx
            .session
            .active_wizard()
            .is_some_and(|state| !selected_fuels(state).is_empty());
        if !has_selection {
            return Err(HandlerError::InvalidInput(
                "Pick at least one fuel type first.".to_string(),
            ));
        }
        wizards.advance(ctx.session, WizardData::new())?;
        return Ok(vec![current_prompt(ctx)?]);
    }

    Err(HandlerError::InvalidInput(
        "Tap a fuel type to select it, then Next.".to_string(),
    ))
}

fn current_prompt(ctx: &CommandContext<'_>) -> Result<OutboundMessage, HandlerError> {
    ctx.session
        .active_wizard()
        .map(prompt)
        .ok_or_else(|| HandlerError::Internal("no active wizard".to_string()))
}

fn summary(preferences: &NotificationPreferences) -> String {
    let fuels: Vec<&str> = preferences.fuel_types.iter().map(FuelType::label).collect();
    format!(
        "Alerts saved: {} in {} below ${:.2}, {} at {}.",
        fuels.join(", "),
        preferences.region,
        preferences.price_threshold,
        preferences.frequency,
        preferences.alert_time
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::circuit_breaker::InMemoryCircuitBreaker;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::prices::InMemoryPriceRepository;
    use crate::application::router::handlers::{builtin_registry, CommandSource, HandlerDeps};
    use crate::application::router::CommandRegistry;
    use crate::application::DegradationController;
    use crate::domain::foundation::{Timestamp, UserKey};
    use crate::domain::session::{ConversationSession, DEFAULT_CONTEXT_TTL};
    use crate::domain::wizard::WizardEngine;
    use crate::ports::{CircuitBreakerConfig, Clock};
    use std::sync::Arc;

    struct Fixture {
        prices: Arc<InMemoryPriceRepository>,
        deps: HandlerDeps,
        registry: CommandRegistry,
        session: ConversationSession,
        now: Timestamp,
    }

    impl Fixture {
        fn started() -> Self {
            let clock = Arc::new(ManualClock::at_epoch_secs(50_000));
            let now = clock.now();
            let prices = Arc::new(InMemoryPriceRepository::new());
            let deps = HandlerDeps {
                prices: prices.clone(),
                wizards: WizardEngine::default(),
                degradation: Arc::new(DegradationController::default()),
                breaker: Arc::new(InMemoryCircuitBreaker::new(
                    "classifier",
                    CircuitBreakerConfig::default(),
                    clock,
                )),
                context_ttl: DEFAULT_CONTEXT_TTL,
            };
            let mut session = ConversationSession::new(UserKey::new("tg:1").unwrap(), now);
            deps.wizards
                .start(&mut session, WizardKind::NotificationSettings, now)
                .unwrap();
            Self {
                prices,
                deps,
                registry: builtin_registry().unwrap(),
                session,
                now,
            }
        }

        async fn send(&mut self, input: &str) -> Result<Vec<OutboundMessage>, HandlerError> {
            let mut ctx = CommandContext {
                session: &mut self.session,
                deps: &self.deps,
                registry: &self.registry,
                now: self.now,
                source: CommandSource::Typed,
            };
            handle_input(&mut ctx, input).await
        }

        fn step(&self) -> u8 {
            self.session.active_wizard().unwrap().current_step()
        }
    }

    #[test]
    fn fuel_prompt_marks_selected_items() {
        let fx = Fixture::started();
        let message = prompt(fx.session.active_wizard().unwrap());
        let keyboard = message.keyboard.unwrap();
        let payloads: Vec<&str> = keyboard.buttons().map(|b| b.payload.as_str()).collect();

        assert!(payloads.contains(&"toggle:diesel"));
        assert!(payloads.contains(&"next"));
        assert!(payloads.contains(&"cancel"));
        assert!(!payloads.contains(&"back"));
    }

    #[tokio::test]
    async fn toggles_update_selection_and_keyboard() {
        let mut fx = Fixture::started();
        let reply = fx.send("toggle:diesel").await.unwrap();

        let labels: Vec<String> = reply[0]
            .keyboard
            .as_ref()
            .unwrap()
            .buttons()
            .map(|b| b.label.clone())
            .collect();
        assert!(labels.contains(&"[x] Diesel".to_string()));
        assert!(labels.contains(&"[ ] Premium".to_string()));
        assert_eq!(fx.step(), 1);
    }

    #[tokio::test]
    async fn untoggling_the_only_fuel_keeps_it_selected() {
        let mut fx = Fixture::started();
        fx.send("toggle:diesel").await.unwrap();
        fx.send("toggle:diesel").await.unwrap();

        let state = fx.session.active_wizard().unwrap();
        assert_eq!(selected_fuels(state), vec!["diesel"]);
    }

    #[tokio::test]
    async fn next_requires_a_selection() {
        let mut fx = Fixture::started();
        let err = fx.send("next").await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
        assert_eq!(fx.step(), 1);
    }

    #[tokio::test]
    async fn invalid_step_input_keeps_the_step() {
        let mut fx = Fixture::started();
        fx.send("toggle:regular").await.unwrap();
        fx.send("next").await.unwrap();
        fx.send("Lisbon").await.unwrap();
        assert_eq!(fx.step(), 3);

        let err = fx.send("-4").await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
        assert_eq!(fx.step(), 3);
    }

    #[tokio::test]
    async fn back_keeps_entered_data() {
        let mut fx = Fixture::started();
        fx.send("toggle:regular").await.unwrap();
        fx.send("next").await.unwrap();
        fx.send("Lisbon").await.unwrap();
        let reply = fx.send("back").await.unwrap();

        assert!(reply[0].text.starts_with("Step 2/5"));
        let data = fx.session.active_wizard().unwrap().data();
        assert_eq!(data.get("region"), Some(&Value::from("Lisbon")));
    }

    #[tokio::test]
    async fn commands_inside_the_wizard_are_refused() {
        let mut fx = Fixture::started();
        let err = fx.send("/prices").await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput(_)));
        assert!(fx.session.has_active_wizard());
    }

    #[tokio::test]
    async fn cancel_clears_without_saving() {
        let mut fx = Fixture::started();
        fx.send("toggle:regular").await.unwrap();
        fx.send("/cancel").await.unwrap();

        assert!(!fx.session.has_active_wizard());
        assert!(fx
            .prices
            .preferences_for(&UserKey::new("tg:1").unwrap())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn full_run_saves_preferences() {
        let mut fx = Fixture::started();
        for input in ["toggle:diesel", "toggle:premium", "next", "Lisbon", "$1,72", "7:30", "daily"] {
            fx.send(input).await.unwrap();
        }

        assert!(!fx.session.has_active_wizard());
        let saved = fx
            .prices
            .preferences_for(&UserKey::new("tg:1").unwrap())
            .await
            .unwrap();
        assert_eq!(saved.fuel_types, vec![FuelType::Diesel, FuelType::Premium]);
        assert_eq!(saved.region, "Lisbon");
        assert!((saved.price_threshold - 1.72).abs() < 1e-9);
        assert_eq!(saved.alert_time, "07:30");
        assert_eq!(saved.frequency, AlertFrequency::Daily);
    }
}

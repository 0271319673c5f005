//! Command handlers and the built-in command set.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::registry::{CommandDescriptor, CommandRegistry, RegistryError};
use super::wizard_flow;
use crate::application::DegradationController;
use crate::domain::foundation::{Timestamp, ValidationError};
use crate::domain::messaging::{Button, Keyboard, OutboundMessage};
use crate::domain::nlp::{Entities, FuelType, Intent, FUEL_TYPE_ENTITY};
use crate::domain::resilience::Feature;
use crate::domain::session::{ContextUpdate, ConversationSession};
use crate::domain::wizard::{WizardEngine, WizardError, WizardKind};
use crate::ports::{CircuitBreaker, PriceRepository, StoreError};

/// Reply sent for dependency failures.
pub const DEPENDENCY_FAILURE_REPLY: &str =
    "That is temporarily unavailable. Please try again in a moment.";

/// Reply sent for internal failures.
pub const INTERNAL_FAILURE_REPLY: &str = "Something went wrong. Please try again.";

/// Failure of a command or wizard step, classified for the user and the log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandlerError {
    /// The user sent something we cannot act on; carries the reply.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator failed.
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// A bug or broken invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Text shown to the user. Internal details never leak.
    pub fn user_message(&self) -> &str {
        match self {
            HandlerError::InvalidInput(message) => message,
            HandlerError::Dependency(_) => DEPENDENCY_FAILURE_REPLY,
            HandlerError::Internal(_) => INTERNAL_FAILURE_REPLY,
        }
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => HandlerError::InvalidInput(format!("Nothing found for {}.", what)),
            StoreError::Unavailable(reason) => HandlerError::Dependency(reason),
        }
    }
}

impl From<WizardError> for HandlerError {
    fn from(err: WizardError) -> Self {
        HandlerError::Internal(err.to_string())
    }
}

impl From<ValidationError> for HandlerError {
    fn from(err: ValidationError) -> Self {
        HandlerError::InvalidInput(err.to_string())
    }
}

/// Collaborators available to every handler.
pub struct HandlerDeps {
    pub prices: Arc<dyn PriceRepository>,
    pub wizards: WizardEngine,
    pub degradation: Arc<DegradationController>,
    pub breaker: Arc<dyn CircuitBreaker>,
    pub context_ttl: Duration,
}

/// How a command was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    /// The user typed or tapped the command.
    Typed,
    /// Free text was classified into the command; context is already merged.
    Classified,
}

/// Per-turn state handed to a handler.
pub struct CommandContext<'a> {
    pub session: &'a mut ConversationSession,
    pub deps: &'a HandlerDeps,
    pub registry: &'a CommandRegistry,
    pub now: Timestamp,
    pub source: CommandSource,
}

impl CommandContext<'_> {
    /// Records the intent behind a typed command so follow-ups resolve.
    fn remember(&mut self, intent: Intent, entities: Entities) {
        if self.source == CommandSource::Typed {
            self.session.merge_context(
                ContextUpdate::new(Some(intent), entities),
                self.now,
                self.deps.context_ttl,
            );
        }
    }
}

/// Behaviour behind one command name.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError>;
}

/// Intent that a command serves, used to map classified free text.
pub fn command_for_intent(intent: Intent) -> Option<&'static str> {
    match intent {
        Intent::PriceQuery => Some("prices"),
        Intent::StationList => Some("stations"),
        Intent::Settings => Some("settings"),
        Intent::Help => Some("help"),
        Intent::Greeting => Some("start"),
        Intent::Unsubscribe => Some("unsubscribe"),
        Intent::Stats => Some("stats"),
        Intent::FollowUp | Intent::Unknown => None,
    }
}

/// Builds the registry with every built-in command.
pub fn builtin_registry() -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register_many([
        ("start", CommandDescriptor::new("Welcome and main menu", Arc::new(StartCommand))),
        ("help", CommandDescriptor::new("List available commands", Arc::new(HelpCommand))),
        (
            "prices",
            CommandDescriptor::new("Current prices, e.g. /prices diesel", Arc::new(PricesCommand)),
        ),
        ("stations", CommandDescriptor::new("Your registered stations", Arc::new(StationsCommand))),
        ("settings", CommandDescriptor::new("Set up price alerts", Arc::new(SettingsCommand))),
        ("cancel", CommandDescriptor::new("Cancel the current setup", Arc::new(CancelCommand))),
        (
            "stats",
            CommandDescriptor::new("Price statistics", Arc::new(StatsCommand)).requires(Feature::Analytics),
        ),
        ("status", CommandDescriptor::new("Service status", Arc::new(StatusCommand))),
        (
            "unsubscribe",
            CommandDescriptor::new("Turn off all alerts", Arc::new(UnsubscribeCommand)).destructive(),
        ),
    ])?;
    Ok(registry)
}

fn main_menu() -> Keyboard {
    Keyboard::new()
        .row(vec![
            Button::new("Prices", "/prices"),
            Button::new("My stations", "/stations"),
        ])
        .row(vec![Button::new("Alerts", "/settings"), Button::new("Help", "/help")])
}

fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

// ─── Built-in commands ───────────────────────────────────────────────

/// `/start`
pub struct StartCommand;

#[async_trait]
impl CommandHandler for StartCommand {
    async fn handle(
        &self,
        _ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        Ok(vec![OutboundMessage::text(
            "Hi! I track fuel prices near you. Ask me something like \"diesel price\" or pick an option below.",
        )
        .with_keyboard(main_menu())])
    }
}

/// `/help`
pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let features = ctx.deps.degradation.features();
        let lines: Vec<String> = ctx
            .registry
            .all()
            .filter(|(_, descriptor)| {
                descriptor
                    .required_feature
                    .map_or(true, |feature| features.is_enabled(feature))
            })
            .map(|(name, descriptor)| format!("/{} - {}", name, descriptor.description))
            .collect();
        Ok(vec![OutboundMessage::text(format!(
            "Available commands:\n{}",
            lines.join("\n")
        ))])
    }
}

/// `/prices [fuel]`
pub struct PricesCommand;

#[async_trait]
impl CommandHandler for PricesCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let fuel = if args.is_empty() {
            None
        } else {
            Some(args.parse::<FuelType>().map_err(|_| {
                let known: Vec<&str> = FuelType::ALL.iter().map(FuelType::as_str).collect();
                HandlerError::InvalidInput(format!(
                    "Unknown fuel type '{}'. Try one of: {}.",
                    args,
                    known.join(", ")
                ))
            })?)
        };

        let prices = ctx.deps.prices.current_prices(fuel).await?;

        let mut entities = Entities::new();
        if let Some(fuel) = fuel {
            entities.insert(FUEL_TYPE_ENTITY.to_string(), fuel.as_str().to_string());
        }
        ctx.remember(Intent::PriceQuery, entities);

        if prices.is_empty() {
            return Ok(vec![OutboundMessage::text("No prices available right now.")]);
        }

        let title = match fuel {
            Some(fuel) => format!("{} prices:", fuel.label()),
            None => "Current prices:".to_string(),
        };
        let lines: Vec<String> = prices
            .iter()
            .map(|p| {
                format!(
                    "{} at {}: {}",
                    p.fuel_type.label(),
                    p.station_name,
                    format_price(p.price)
                )
            })
            .collect();
        Ok(vec![OutboundMessage::text(format!("{}\n{}", title, lines.join("\n")))])
    }
}

/// `/stations`
pub struct StationsCommand;

#[async_trait]
impl CommandHandler for StationsCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let stations = ctx.deps.prices.user_stations(ctx.session.user_key()).await?;
        ctx.remember(Intent::StationList, Entities::new());

        if stations.is_empty() {
            return Ok(vec![OutboundMessage::text(
                "You have no registered stations yet.",
            )]);
        }
        let lines: Vec<String> = stations
            .iter()
            .map(|s| format!("{} ({})", s.name, s.region))
            .collect();
        Ok(vec![OutboundMessage::text(format!(
            "Your stations:\n{}",
            lines.join("\n")
        ))])
    }
}

/// `/settings` starts the notification wizard.
pub struct SettingsCommand;

#[async_trait]
impl CommandHandler for SettingsCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let state = ctx
            .deps
            .wizards
            .start(ctx.session, WizardKind::NotificationSettings, ctx.now)?;
        Ok(vec![wizard_flow::prompt(state)])
    }
}

/// `/cancel` outside a wizard.
pub struct CancelCommand;

#[async_trait]
impl CommandHandler for CancelCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let reply = match ctx.deps.wizards.cancel(ctx.session) {
            Some(_) => "Setup cancelled.",
            None => "Nothing to cancel.",
        };
        Ok(vec![OutboundMessage::text(reply)])
    }
}

/// `/stats`
pub struct StatsCommand;

#[async_trait]
impl CommandHandler for StatsCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let stats = ctx.deps.prices.stats().await?;
        if stats.is_empty() {
            return Ok(vec![OutboundMessage::text("No statistics yet.")]);
        }
        let lines: Vec<String> = stats
            .iter()
            .map(|s| {
                format!(
                    "{}: avg {} (min {}, max {}, {} stations)",
                    s.fuel_type.label(),
                    format_price(s.average),
                    format_price(s.min),
                    format_price(s.max),
                    s.samples
                )
            })
            .collect();
        Ok(vec![OutboundMessage::text(format!(
            "Price statistics:\n{}",
            lines.join("\n")
        ))])
    }
}

/// `/status`
pub struct StatusCommand;

#[async_trait]
impl CommandHandler for StatusCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let level = ctx.deps.degradation.level();
        let features = ctx.deps.degradation.features();
        let on_off = |enabled: bool| if enabled { "on" } else { "off" };
        Ok(vec![OutboundMessage::text(format!(
            "Service level: {}\nSmart replies: {}\nStatistics: {}\nSlow mode: {}\nClassifier: {}",
            level,
            on_off(features.nlp_enabled),
            on_off(features.analytics_enabled),
            on_off(features.slow_mode_enabled),
            ctx.deps.breaker.state()
        ))])
    }
}

/// `/unsubscribe`
pub struct UnsubscribeCommand;

#[async_trait]
impl CommandHandler for UnsubscribeCommand {
    async fn handle(
        &self,
        ctx: &mut CommandContext<'_>,
        _args: &str,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        let reply = match ctx.deps.prices.disable_alerts(ctx.session.user_key()).await {
            Ok(()) => "Alerts disabled. Use /settings to set them up again.",
            Err(StoreError::NotFound(_)) => "You have no active alerts.",
            Err(err) => return Err(err.into()),
        };
        Ok(vec![OutboundMessage::text(reply)])
    }
}

//! MessageRouter - per-turn dispatch.
//!
//! Order of work for one inbound message:
//!
//! 1. Admission (rate limit, conversation slot). Rejections never touch
//!    the session.
//! 2. Per-user lock, then load the session.
//! 3. Expire a timed-out wizard and stale context.
//! 4. Active wizard gets the input; otherwise a registered command runs;
//!    otherwise free text goes to the NLP gateway (or a static reply when
//!    NLP is off).
//! 5. Save the session. When the handler failed or panicked, the session
//!    as it was before the handler ran is saved instead.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

use super::handlers::{
    command_for_intent, CommandContext, CommandSource, HandlerDeps, HandlerError,
    INTERNAL_FAILURE_REPLY,
};
use super::registry::{parse_command, CommandDescriptor, CommandRegistry, DEFAULT_SUGGESTIONS};
use super::wizard_flow;
use crate::application::{
    Admission, ConcurrencyGuard, DegradationController, NlpGateway, SessionStore,
};
use crate::domain::foundation::{Timestamp, TurnId};
use crate::domain::messaging::{Button, InboundMessage, Keyboard, OutboundMessage, TurnOutcome, TurnReply};
use crate::domain::resilience::Feature;
use crate::domain::session::ConversationSession;
use crate::ports::Clock;

/// Reply when NLP is switched off.
pub const NLP_DISABLED_REPLY: &str =
    "Smart replies are paused right now. Please use a command, for example /prices or /help.";

/// Reply when free text could not be understood.
pub const NOT_UNDERSTOOD_REPLY: &str = "Sorry, I didn't get that. Send /help to see what I can do.";

/// Reply when all conversation slots are taken.
pub const BUSY_REPLY: &str = "I'm handling a lot of conversations right now. Please try again in a moment.";

/// Reply when a wizard expired before this message.
pub const WIZARD_TIMEOUT_NOTICE: &str = "Your alert setup timed out and was cancelled.";

type Dispatch = Result<(TurnOutcome, Vec<OutboundMessage>), HandlerError>;

/// Routes inbound messages to wizards, commands and the NLP gateway.
pub struct MessageRouter {
    registry: Arc<CommandRegistry>,
    deps: Arc<HandlerDeps>,
    sessions: Arc<SessionStore>,
    guard: Arc<ConcurrencyGuard>,
    nlp: Arc<NlpGateway>,
    clock: Arc<dyn Clock>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<CommandRegistry>,
        deps: Arc<HandlerDeps>,
        sessions: Arc<SessionStore>,
        guard: Arc<ConcurrencyGuard>,
        nlp: Arc<NlpGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            deps,
            sessions,
            guard,
            nlp,
            clock,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn degradation(&self) -> &Arc<DegradationController> {
        &self.deps.degradation
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn guard(&self) -> &Arc<ConcurrencyGuard> {
        &self.guard
    }

    pub fn nlp(&self) -> &Arc<NlpGateway> {
        &self.nlp
    }

    /// Handles one inbound message. Never fails; every failure becomes a reply.
    pub async fn route(&self, message: InboundMessage) -> TurnReply {
        let turn_id = TurnId::new();
        let digest = message.user_key.digest();
        let span = tracing::info_span!(
            "turn",
            turn_id = %turn_id,
            user = %&digest[..12],
            callback = message.is_callback()
        );
        self.route_turn(message).instrument(span).await
    }

    async fn route_turn(&self, message: InboundMessage) -> TurnReply {
        let user = message.user_key.clone();

        let _permit = match self.guard.try_acquire(&user).await {
            Admission::Admitted(permit) => permit,
            Admission::RateLimited { retry_after_secs } => {
                return TurnReply::single(
                    TurnOutcome::RateLimited,
                    OutboundMessage::text(format!(
                        "You're sending messages too quickly. Please wait {} seconds.",
                        retry_after_secs
                    )),
                );
            }
            Admission::Busy => {
                return TurnReply::single(TurnOutcome::Busy, OutboundMessage::text(BUSY_REPLY));
            }
        };

        let _lock = self.sessions.lock(&user).await;
        let mut session = self.sessions.load(&user).await;
        let now = self.clock.now();

        let mut notices = Vec::new();
        if let Some(expired) = self.deps.wizards.expire_if_timed_out(&mut session, now) {
            tracing::debug!(wizard = %expired.kind(), step = expired.current_step(), "wizard timed out");
            notices.push(OutboundMessage::text(WIZARD_TIMEOUT_NOTICE));
        }
        session.clear_expired_context(now, self.deps.context_ttl);
        session.touch(now);

        let before = session.clone();
        let dispatched = AssertUnwindSafe(self.dispatch(&mut session, &message, now))
            .catch_unwind()
            .await;

        let reply = match dispatched {
            Ok(Ok((outcome, messages))) => {
                let response = messages.first().map(|m| m.text.as_str()).unwrap_or_default();
                session.add_to_history(message.input(), response, now);
                self.sessions.save(&session).await;
                TurnReply::new(outcome, messages)
            }
            Ok(Err(err)) => {
                let outcome = match &err {
                    HandlerError::InvalidInput(reason) => {
                        tracing::debug!(reason = %reason, "invalid input");
                        TurnOutcome::Handled
                    }
                    HandlerError::Dependency(reason) => {
                        tracing::warn!(reason = %reason, "dependency failure during turn");
                        TurnOutcome::Failed
                    }
                    HandlerError::Internal(reason) => {
                        tracing::error!(reason = %reason, "internal error during turn");
                        TurnOutcome::Failed
                    }
                };
                self.sessions.save(&before).await;
                TurnReply::single(outcome, OutboundMessage::text(err.user_message()))
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                tracing::error!(panic = %detail, "handler panicked");
                self.sessions.save(&before).await;
                TurnReply::single(TurnOutcome::Failed, OutboundMessage::text(INTERNAL_FAILURE_REPLY))
            }
        };

        if notices.is_empty() {
            reply
        } else {
            notices.extend(reply.messages);
            TurnReply::new(reply.outcome, notices)
        }
    }

    async fn dispatch(
        &self,
        session: &mut ConversationSession,
        message: &InboundMessage,
        now: Timestamp,
    ) -> Dispatch {
        let input = message.input();
        if input.is_empty() {
            return Err(HandlerError::InvalidInput(
                "Send me a question or a command like /help.".to_string(),
            ));
        }

        if session.has_active_wizard() {
            let mut ctx = self.context(session, now, CommandSource::Typed);
            let messages = wizard_flow::handle_input(&mut ctx, input).await?;
            return Ok((TurnOutcome::Handled, messages));
        }

        if let Some((name, args)) = parse_command(input) {
            return match self.registry.get(&name) {
                Some(descriptor) => {
                    let messages = self
                        .run_command(&name, descriptor, args, session, now, CommandSource::Typed)
                        .await?;
                    Ok((TurnOutcome::Handled, messages))
                }
                None => Ok(self.unknown_command(&name)),
            };
        }

        if message.is_callback() {
            return Err(HandlerError::InvalidInput(
                "That button is no longer active. Send /help to start again.".to_string(),
            ));
        }

        self.free_text(session, input, now).await
    }

    async fn free_text(&self, session: &mut ConversationSession, text: &str, now: Timestamp) -> Dispatch {
        if !self.deps.degradation.is_feature_enabled(Feature::Nlp) {
            return Ok((TurnOutcome::Fallback, vec![OutboundMessage::text(NLP_DISABLED_REPLY)]));
        }

        let result = self.nlp.process(text, session).await;
        let classification = &result.classification;
        tracing::debug!(
            intent = %classification.intent,
            confidence = classification.confidence,
            used_fallback = result.used_fallback,
            "free text classified"
        );

        let Some((name, descriptor)) = command_for_intent(classification.intent)
            .and_then(|name| self.registry.get(name).map(|d| (name, d)))
        else {
            return Ok((
                TurnOutcome::Fallback,
                vec![OutboundMessage::text(NOT_UNDERSTOOD_REPLY)],
            ));
        };

        if descriptor.destructive && result.low_confidence {
            let text = format!(
                "Did you mean /{} ({})? Tap to confirm.",
                name,
                descriptor.description.to_lowercase()
            );
            let keyboard = Keyboard::new().row(vec![
                Button::new(format!("Yes, /{}", name), format!("/{}", name)),
                Button::new("No", "/help"),
            ]);
            return Ok((
                TurnOutcome::Suggested,
                vec![OutboundMessage::text(text).with_keyboard(keyboard)],
            ));
        }

        let args = classification
            .fuel_type()
            .filter(|_| name == "prices")
            .map(|fuel| fuel.as_str())
            .unwrap_or_default();
        let messages = self
            .run_command(name, descriptor, args, session, now, CommandSource::Classified)
            .await?;
        let outcome = if result.used_fallback {
            TurnOutcome::Fallback
        } else {
            TurnOutcome::Handled
        };
        Ok((outcome, messages))
    }

    async fn run_command(
        &self,
        name: &str,
        descriptor: &CommandDescriptor,
        args: &str,
        session: &mut ConversationSession,
        now: Timestamp,
        source: CommandSource,
    ) -> Result<Vec<OutboundMessage>, HandlerError> {
        if let Some(feature) = descriptor.required_feature {
            if !self.deps.degradation.is_feature_enabled(feature) {
                tracing::debug!(command = name, feature = %feature, "command gated by degradation");
                return Ok(vec![OutboundMessage::text(format!(
                    "/{} is temporarily unavailable. Please try again later.",
                    name
                ))]);
            }
        }

        let mut ctx = self.context(session, now, source);
        descriptor.handler.handle(&mut ctx, args).await
    }

    fn unknown_command(&self, name: &str) -> (TurnOutcome, Vec<OutboundMessage>) {
        let suggestions = self.registry.find_similar(name, DEFAULT_SUGGESTIONS);
        if suggestions.is_empty() {
            return (
                TurnOutcome::Fallback,
                vec![OutboundMessage::text(format!(
                    "Unknown command /{}. Send /help for the list.",
                    name
                ))],
            );
        }

        let listed: Vec<String> = suggestions.iter().map(|s| format!("/{}", s)).collect();
        let buttons = suggestions
            .iter()
            .map(|s| Button::new(format!("/{}", s), format!("/{}", s)))
            .collect();
        (
            TurnOutcome::Suggested,
            vec![OutboundMessage::text(format!(
                "Unknown command /{}. Did you mean {}?",
                name,
                listed.join(" or ")
            ))
            .with_keyboard(Keyboard::new().row(buttons))],
        )
    }

    fn context<'a>(
        &'a self,
        session: &'a mut ConversationSession,
        now: Timestamp,
        source: CommandSource,
    ) -> CommandContext<'a> {
        CommandContext {
            session,
            deps: &self.deps,
            registry: &self.registry,
            now,
            source,
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("commands", &self.registry.len())
            .field("sessions", &self.sessions)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryCircuitBreaker, InMemoryPriceRepository, InMemoryRateLimiter,
        InMemorySessionStorage, ManualClock, MockIntentClassifier, RateLimitConfig,
    };
    use crate::application::router::handlers::{builtin_registry, CommandHandler};
    use crate::application::{NlpGatewayConfig, SessionStoreConfig};
    use crate::domain::foundation::UserKey;
    use crate::domain::wizard::{WizardEngine, WizardKind};
    use crate::ports::{CircuitBreaker, CircuitBreakerConfig};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Opens a wizard on the session, then panics before returning.
    struct PanickingHandler;

    #[async_trait]
    impl CommandHandler for PanickingHandler {
        async fn handle(
            &self,
            ctx: &mut CommandContext<'_>,
            _args: &str,
        ) -> Result<Vec<OutboundMessage>, HandlerError> {
            ctx.deps
                .wizards
                .start(ctx.session, WizardKind::NotificationSettings, ctx.now)
                .map_err(|err| HandlerError::Internal(err.to_string()))?;
            panic!("handler blew up mid-turn");
        }
    }

    fn router_with_panicking_command() -> MessageRouter {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
        let degradation = Arc::new(DegradationController::default());
        let breaker: Arc<dyn CircuitBreaker> = Arc::new(InMemoryCircuitBreaker::new(
            "classifier",
            CircuitBreakerConfig::default(),
            clock.clone(),
        ));

        let mut registry = builtin_registry().unwrap();
        registry
            .register(
                "explode",
                CommandDescriptor::new("Always panics", Arc::new(PanickingHandler)),
            )
            .unwrap();

        let deps = Arc::new(HandlerDeps {
            prices: Arc::new(InMemoryPriceRepository::with_sample_data(clock.now())),
            wizards: WizardEngine::default(),
            degradation: degradation.clone(),
            breaker: breaker.clone(),
            context_ttl: Duration::from_secs(300),
        });
        let sessions = Arc::new(SessionStore::new(
            Arc::new(InMemorySessionStorage::with_clock(clock.clone())),
            clock.clone(),
            SessionStoreConfig::default(),
        ));
        let guard = Arc::new(ConcurrencyGuard::new(
            Arc::new(InMemoryRateLimiter::with_clock(
                RateLimitConfig::default(),
                clock.clone(),
            )),
            degradation.clone(),
            16,
        ));
        let nlp = Arc::new(NlpGateway::new(
            Arc::new(MockIntentClassifier::new()),
            breaker,
            degradation,
            clock.clone(),
            NlpGatewayConfig::default(),
        ));

        MessageRouter::new(Arc::new(registry), deps, sessions, guard, nlp, clock)
    }

    #[tokio::test]
    async fn panicking_handler_fails_the_turn_and_keeps_the_session() {
        let router = router_with_panicking_command();
        let user = UserKey::new("tg:42").unwrap();

        let greeting = router.route(InboundMessage::text(user.clone(), "/start")).await;
        assert_eq!(greeting.outcome, TurnOutcome::Handled);
        let before = router.sessions().load(&user).await;
        assert_eq!(before.history_len(), 1);
        assert!(!before.has_active_wizard());

        let reply = router.route(InboundMessage::text(user.clone(), "/explode")).await;

        assert_eq!(reply.outcome, TurnOutcome::Failed);
        assert_eq!(reply.first_text(), INTERNAL_FAILURE_REPLY);
        let after = router.sessions().load(&user).await;
        assert_eq!(after.history_len(), 1);
        assert!(!after.has_active_wizard());
    }

    #[tokio::test]
    async fn router_keeps_serving_after_a_panic() {
        let router = router_with_panicking_command();
        let user = UserKey::new("tg:43").unwrap();

        let failed = router.route(InboundMessage::text(user.clone(), "/explode")).await;
        assert_eq!(failed.outcome, TurnOutcome::Failed);

        let next = router.route(InboundMessage::text(user.clone(), "/help")).await;
        assert_eq!(next.outcome, TurnOutcome::Handled);
        assert_eq!(router.sessions().load(&user).await.history_len(), 1);
    }
}

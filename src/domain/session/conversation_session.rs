//! Per-user conversation session.
//!
//! Holds the active wizard (at most one), the short-lived conversational
//! context, and a bounded rolling history. Each part expires independently:
//! the wizard by its own TTL from start, the context by the context TTL
//! from its last update, the whole session by the store's inactivity TTL.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::context::{ContextUpdate, ConversationContext};
use crate::domain::foundation::{Timestamp, UserKey};
use crate::domain::wizard::WizardState;

/// Number of query/response pairs retained in history.
pub const HISTORY_LIMIT: usize = 5;

/// One query/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub response: String,
    pub at: Timestamp,
}

/// In-memory representation of one user's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    user_key: UserKey,
    #[serde(default)]
    active_wizard: Option<WizardState>,
    #[serde(default)]
    context: Option<ConversationContext>,
    #[serde(default)]
    history: VecDeque<HistoryEntry>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl ConversationSession {
    /// Creates an empty session for a user.
    pub fn new(user_key: UserKey, now: Timestamp) -> Self {
        Self {
            user_key,
            active_wizard: None,
            context: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Records activity on the session.
    pub fn touch(&mut self, now: Timestamp) {
        if now.is_after(&self.updated_at) {
            self.updated_at = now;
        }
    }

    // ─── Wizard ──────────────────────────────────────────────────────

    pub fn active_wizard(&self) -> Option<&WizardState> {
        self.active_wizard.as_ref()
    }

    pub fn has_active_wizard(&self) -> bool {
        self.active_wizard.is_some()
    }

    pub(crate) fn active_wizard_mut(&mut self) -> Option<&mut WizardState> {
        self.active_wizard.as_mut()
    }

    pub(crate) fn set_active_wizard(&mut self, state: WizardState) {
        self.active_wizard = Some(state);
    }

    pub(crate) fn take_active_wizard(&mut self) -> Option<WizardState> {
        self.active_wizard.take()
    }

    // ─── Conversational context ──────────────────────────────────────

    /// Returns the stored context regardless of expiry.
    pub fn raw_context(&self) -> Option<&ConversationContext> {
        self.context.as_ref()
    }

    /// Returns the context only if it has not expired.
    pub fn context(&self, now: Timestamp, ttl: Duration) -> Option<&ConversationContext> {
        self.context.as_ref().filter(|ctx| !ctx.is_expired(now, ttl))
    }

    /// True iff a context is stored and strictly more than `ttl` has passed
    /// since it was last updated. A session without context is not expired.
    pub fn is_context_expired(&self, now: Timestamp, ttl: Duration) -> bool {
        self.context
            .as_ref()
            .is_some_and(|ctx| ctx.is_expired(now, ttl))
    }

    /// Wipes the context if expired, leaving wizard and history untouched.
    ///
    /// Returns true if anything was cleared.
    pub fn clear_expired_context(&mut self, now: Timestamp, ttl: Duration) -> bool {
        if self.is_context_expired(now, ttl) {
            self.context = None;
            true
        } else {
            false
        }
    }

    /// Merges new intent/entities into the context.
    ///
    /// An expired context is treated as absent, so nothing from it is
    /// carried into `last_intent`/`last_entities`.
    pub fn merge_context(&mut self, update: ContextUpdate, now: Timestamp, ttl: Duration) {
        self.clear_expired_context(now, ttl);
        match self.context.as_mut() {
            Some(ctx) => ctx.merge(update, now),
            None => self.context = Some(ConversationContext::from_update(update, now)),
        }
        self.touch(now);
    }

    // ─── History ─────────────────────────────────────────────────────

    /// Appends an exchange, evicting the oldest beyond [`HISTORY_LIMIT`].
    pub fn add_to_history(
        &mut self,
        query: impl Into<String>,
        response: impl Into<String>,
        now: Timestamp,
    ) {
        self.history.push_back(HistoryEntry {
            query: query.into(),
            response: response.into(),
            at: now,
        });
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.touch(now);
    }

    /// History, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// The most recent `n` exchanges, oldest first.
    pub fn recent_history(&self, n: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().skip(self.history.len().saturating_sub(n))
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

//! Session configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::SessionStoreConfig;

/// Lifetimes of sessions, context and wizards.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds before conversational context is considered stale
    #[serde(default = "default_context_ttl")]
    pub context_ttl_secs: u64,

    /// Seconds a wizard may stay open from its start
    #[serde(default = "default_wizard_ttl")]
    pub wizard_ttl_secs: u64,

    /// Seconds of inactivity before a stored session is dropped
    #[serde(default = "default_inactivity_ttl")]
    pub inactivity_ttl_secs: u64,

    /// Prefix of storage keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl SessionConfig {
    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }

    pub fn wizard_ttl(&self) -> Duration {
        Duration::from_secs(self.wizard_ttl_secs)
    }

    pub fn inactivity_ttl(&self) -> Duration {
        Duration::from_secs(self.inactivity_ttl_secs)
    }

    pub fn store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            key_prefix: self.key_prefix.clone(),
            inactivity_ttl: self.inactivity_ttl(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.context_ttl_secs == 0 {
            return Err(ValidationError::InvalidTimeout("session.context_ttl_secs"));
        }
        if self.wizard_ttl_secs == 0 {
            return Err(ValidationError::InvalidTimeout("session.wizard_ttl_secs"));
        }
        if self.inactivity_ttl_secs == 0 {
            return Err(ValidationError::InvalidTimeout("session.inactivity_ttl_secs"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_ttl_secs: default_context_ttl(),
            wizard_ttl_secs: default_wizard_ttl(),
            inactivity_ttl_secs: default_inactivity_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_context_ttl() -> u64 {
    300
}

fn default_wizard_ttl() -> u64 {
    300
}

fn default_inactivity_ttl() -> u64 {
    1800
}

fn default_key_prefix() -> String {
    "session".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.context_ttl(), Duration::from_secs(300));
        assert_eq!(config.wizard_ttl(), Duration::from_secs(300));
        assert_eq!(config.store_config().inactivity_ttl, Duration::from_secs(1800));
        assert_eq!(config.store_config().key_prefix, "session");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let config = SessionConfig {
            wizard_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidTimeout("session.wizard_ttl_secs"))
        );
    }
}

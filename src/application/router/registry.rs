//! CommandRegistry - static table from command name to handler.
//!
//! Built once at start-up and shared read-only afterwards. Lookups are
//! exact; [`CommandRegistry::find_similar`] only produces suggestions for
//! the "unknown command" reply and never dispatches anything.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::handlers::CommandHandler;
use crate::domain::resilience::Feature;

/// Default number of suggestions for an unknown command.
pub const DEFAULT_SUGGESTIONS: usize = 3;

/// Errors raised while building the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid command name '{0}'")]
    InvalidName(String),

    #[error("command '/{0}' is already registered")]
    Duplicate(String),
}

/// A registered command and its dispatch metadata.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub description: String,
    /// Feature that must be enabled for the command to run.
    pub required_feature: Option<Feature>,
    /// Commands with lasting effects; never auto-run on a low-confidence match.
    pub destructive: bool,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(description: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            description: description.into(),
            required_feature: None,
            destructive: false,
            handler,
        }
    }

    pub fn requires(mut self, feature: Feature) -> Self {
        self.required_feature = Some(feature);
        self
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("description", &self.description)
            .field("required_feature", &self.required_feature)
            .field("destructive", &self.destructive)
            .finish_non_exhaustive()
    }
}

/// Command table keyed by lowercase name without the leading slash.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one command. Names are case-insensitive and may be given
    /// with or without the leading `/`.
    pub fn register(
        &mut self,
        name: &str,
        descriptor: CommandDescriptor,
    ) -> Result<(), RegistryError> {
        let name = normalize(name).ok_or_else(|| RegistryError::InvalidName(name.to_string()))?;
        if self.commands.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.commands.insert(name, descriptor);
        Ok(())
    }

    /// Registers several commands, stopping at the first error.
    pub fn register_many<'a, I>(&mut self, commands: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (&'a str, CommandDescriptor)>,
    {
        for (name, descriptor) in commands {
            self.register(name, descriptor)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        normalize(name).and_then(|name| self.commands.get(&name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All commands, sorted by name.
    pub fn all(&self) -> impl Iterator<Item = (&str, &CommandDescriptor)> {
        self.commands.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered names close to `attempted`, best match first.
    ///
    /// A name qualifies when its edit distance is small relative to its
    /// length or when one name contains the other.
    pub fn find_similar(&self, attempted: &str, max_results: usize) -> Vec<String> {
        let Some(attempted) = normalize(attempted) else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, &String)> = self
            .commands
            .keys()
            .filter_map(|name| {
                let distance = levenshtein_distance(name, &attempted);
                let max_distance = (name.chars().count() / 3).max(2);
                let related = name.contains(attempted.as_str()) || attempted.contains(name.as_str());
                (distance <= max_distance || related).then_some((distance, name))
            })
            .collect();

        scored.sort();
        scored
            .into_iter()
            .take(max_results)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

/// Splits `/name@bot args` into `(name, args)`.
///
/// Returns `None` for input that is not a command.
pub fn parse_command(input: &str) -> Option<(String, &str)> {
    let rest = input.trim().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    // Group chats address commands as /name@botname.
    let head = head.split('@').next().unwrap_or(head);
    normalize(head).map(|name| (name, args))
}

fn normalize(name: &str) -> Option<String> {
    let name = name.trim().trim_start_matches('/').to_lowercase();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::router::handlers::{CommandContext, HandlerError};
    use crate::domain::messaging::OutboundMessage;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(
            &self,
            _ctx: &mut CommandContext<'_>,
            _args: &str,
        ) -> Result<Vec<OutboundMessage>, HandlerError> {
            Ok(vec![])
        }
    }

    fn descriptor(description: &str) -> CommandDescriptor {
        CommandDescriptor::new(description, Arc::new(Noop))
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .register_many([
                ("start", descriptor("Start")),
                ("help", descriptor("Help")),
                ("prices", descriptor("Prices")),
                ("stations", descriptor("Stations")),
                ("settings", descriptor("Settings")),
                ("stats", descriptor("Stats")),
                ("status", descriptor("Status")),
                ("unsubscribe", descriptor("Unsubscribe").destructive()),
            ])
            .unwrap();
        registry
    }

    // ─── Registration ────────────────────────────────────────────────

    #[test]
    fn names_are_case_insensitive_and_slash_optional() {
        let registry = registry();
        assert!(registry.contains("/Prices"));
        assert!(registry.contains("HELP"));
        assert!(!registry.contains("price"));
    }

    #[test]
    fn duplicate_and_invalid_names_are_rejected() {
        let mut registry = registry();
        assert_eq!(
            registry.register("/help", descriptor("again")),
            Err(RegistryError::Duplicate("help".to_string()))
        );
        assert!(matches!(
            registry.register("bad name", descriptor("x")),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            registry.register("/", descriptor("x")),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn all_is_sorted_and_keeps_metadata() {
        let registry = registry();
        let names: Vec<&str> = registry.all().map(|(name, _)| name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(registry.len(), 8);
        assert!(registry.get("unsubscribe").unwrap().destructive);
    }

    // ─── Suggestions ─────────────────────────────────────────────────

    #[test]
    fn typo_suggests_closest_command_first() {
        let registry = registry();
        let suggestions = registry.find_similar("/prcies", DEFAULT_SUGGESTIONS);
        assert_eq!(suggestions.first().map(String::as_str), Some("prices"));
    }

    #[test]
    fn suggestions_are_capped() {
        let registry = registry();
        let suggestions = registry.find_similar("stat", DEFAULT_SUGGESTIONS);
        assert!(suggestions.len() <= DEFAULT_SUGGESTIONS);
        assert!(suggestions.contains(&"stats".to_string()));
        assert!(suggestions.contains(&"status".to_string()));
    }

    #[test]
    fn unrelated_input_has_no_suggestions() {
        let registry = registry();
        assert!(registry.find_similar("xylophone", 3).is_empty());
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("help", "help"), 0);
        assert_eq!(levenshtein_distance("stats", "status"), 1);
    }

    // ─── Parsing ─────────────────────────────────────────────────────

    #[test]
    fn parses_command_name_and_args() {
        assert_eq!(parse_command("/prices diesel"), Some(("prices".to_string(), "diesel")));
        assert_eq!(parse_command("  /Help  "), Some(("help".to_string(), "")));
        assert_eq!(parse_command("/prices@FuelBot  premium "), Some(("prices".to_string(), "premium")));
        assert_eq!(parse_command("prices"), None);
        assert_eq!(parse_command("/"), None);
    }
}

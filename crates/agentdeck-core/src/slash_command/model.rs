//! Slash command registry model.

use serde::{Deserialize, Serialize};

/// A command registry entry as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    /// Command name (used as /name in chat)
    pub command_name: String,
    /// Alternative names that resolve to the same command
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl SlashCommand {
    pub fn new(command_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command_name: command_name.into(),
            aliases: Vec::new(),
            description: description.into(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive prefix match on the name or any alias.
    pub fn matches_prefix(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.names()
            .any(|name| name.to_lowercase().starts_with(&query))
    }

    /// Case-insensitive exact match on the name or any alias.
    pub fn is_named(&self, name: &str) -> bool {
        self.names().any(|candidate| candidate.eq_ignore_ascii_case(name))
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.command_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

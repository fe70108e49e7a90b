//! Commands that take a structured argument.
//!
//! These are known to the client because their argument candidates come
//! from client-side lists (tools, agents, inject targets). They are defined
//! once and cached for the lifetime of the process.

use serde::Serialize;
use std::sync::OnceLock;

/// Source of argument candidates for an argument-taking command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    /// Available tools
    Tool,
    /// Available agents
    Agent,
    /// Inject targets
    Inject,
}

/// An argument-taking command.
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentCommand {
    /// Command name (without the leading /)
    pub name: &'static str,
    /// Usage format (e.g., "/tool <name>")
    pub usage: &'static str,
    pub kind: ArgumentKind,
}

impl ArgumentCommand {
    pub const fn new(name: &'static str, usage: &'static str, kind: ArgumentKind) -> Self {
        Self { name, usage, kind }
    }
}

static ARGUMENT_COMMANDS: OnceLock<Vec<ArgumentCommand>> = OnceLock::new();

/// Returns every argument-taking command.
pub fn argument_commands() -> &'static [ArgumentCommand] {
    ARGUMENT_COMMANDS.get_or_init(|| {
        vec![
            ArgumentCommand::new("tool", "/tool <tool name> [input]", ArgumentKind::Tool),
            ArgumentCommand::new("invoke", "/invoke <agent> [message]", ArgumentKind::Agent),
            ArgumentCommand::new("switch", "/switch <agent>", ArgumentKind::Agent),
            ArgumentCommand::new("inject", "/inject <target> <content>", ArgumentKind::Inject),
        ]
    })
}

/// Finds an argument-taking command by (lowercased) name.
pub fn find_argument_command(name: &str) -> Option<&'static ArgumentCommand> {
    argument_commands().iter().find(|cmd| cmd.name == name)
}

//! Slash-command interpreter.
//!
//! Turns the raw prompt text into an [`InputMode`] plus a suggestion list and
//! decides what Up/Down/Tab/Enter/Escape mean while a command is being typed.
//! The interpreter never touches the network; it only rewrites input.

use super::state::{CommandEntryState, InputMode};
use agentdeck_core::slash_command::{ArgumentKind, SlashCommand, find_argument_command};
use serde::Serialize;
use tracing::debug;

/// Default number of suggestions shown at once.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Keys the prompt reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Tab,
    Enter,
    Escape,
}

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Command name or argument value, without decoration
    pub value: String,
    pub description: String,
}

/// Client-side candidate lists for argument-taking commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandContext {
    pub tools: Vec<String>,
    pub agents: Vec<String>,
    pub inject_targets: Vec<String>,
}

impl CommandContext {
    pub fn candidates(&self, kind: ArgumentKind) -> &[String] {
        match kind {
            ArgumentKind::Tool => &self.tools,
            ArgumentKind::Agent => &self.agents,
            ArgumentKind::Inject => &self.inject_targets,
        }
    }
}

/// What a Tab/Enter commit selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Command(String),
    Argument {
        command: String,
        kind: ArgumentKind,
        value: String,
    },
}

/// Result of offering a key to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpreterAction {
    /// Not a command-entry key; the caller handles it.
    PassThrough,
    /// Handled without changing the input.
    Consumed,
    /// Handled; the input must be replaced with `input`.
    Rewrite { input: String, commit: Commit },
}

pub struct CommandInterpreter {
    registry: Vec<SlashCommand>,
    context: CommandContext,
    limit: usize,
    mode: InputMode,
    suggestions: Vec<Suggestion>,
    selected: usize,
    /// Set by Escape or a completed command; cleared once the input stops
    /// starting with `/`.
    dismissed: bool,
    /// Input written by the last argument commit, with the state it fixed.
    /// Holds while the input still starts with that text.
    chosen: Option<(String, CommandEntryState)>,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_SUGGESTION_LIMIT)
    }
}

impl CommandInterpreter {
    pub fn new(limit: usize) -> Self {
        Self {
            registry: Vec::new(),
            context: CommandContext::default(),
            limit: limit.max(1),
            mode: InputMode::Normal,
            suggestions: Vec::new(),
            selected: 0,
            dismissed: false,
            chosen: None,
        }
    }

    pub fn set_registry(&mut self, registry: Vec<SlashCommand>) {
        debug!("[CommandInterpreter] Registry loaded: {} commands", registry.len());
        self.registry = registry;
    }

    pub fn registry(&self) -> &[SlashCommand] {
        &self.registry
    }

    pub fn set_context(&mut self, context: CommandContext) {
        self.context = context;
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Suggestion> {
        self.suggestions.get(self.selected)
    }

    /// Whether the first token of `input` names a known command.
    ///
    /// Plain text and unknown `/words` are not commands and are sent as
    /// ordinary messages. As with command entry, the `/` must be the first
    /// character.
    pub fn recognizes(&self, input: &str) -> bool {
        let Some(body) = input.strip_prefix('/') else {
            return false;
        };
        let name = body
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if name.is_empty() {
            return false;
        }
        find_argument_command(&name).is_some() || self.registry.iter().any(|c| c.is_named(&name))
    }

    /// Re-derives mode and suggestions from the current input.
    pub fn update_input(&mut self, input: &str) {
        if !input.starts_with('/') {
            self.dismissed = false;
        }
        if self
            .chosen
            .as_ref()
            .is_some_and(|(written, _)| !input.starts_with(written.as_str()))
        {
            self.chosen = None;
        }

        let mode = if self.dismissed {
            InputMode::Normal
        } else if let Some((_, state)) = self.chosen.as_ref() {
            InputMode::CommandEntry(state.clone())
        } else {
            CommandEntryState::parse(input)
                .map(InputMode::CommandEntry)
                .unwrap_or_default()
        };

        let suggestions = match mode.entry_state() {
            Some(state) => self.suggest(state),
            None => Vec::new(),
        };
        if suggestions != self.suggestions {
            self.selected = 0;
        }
        self.suggestions = suggestions;
        self.mode = mode;
    }

    /// Offers a key press to the interpreter.
    pub fn handle_key(&mut self, key: Key) -> InterpreterAction {
        let Some(state) = self.mode.entry_state().cloned() else {
            return InterpreterAction::PassThrough;
        };

        match key {
            Key::Up => {
                self.selected = self.selected.saturating_sub(1);
                InterpreterAction::Consumed
            }
            Key::Down => {
                if self.selected + 1 < self.suggestions.len() {
                    self.selected += 1;
                }
                InterpreterAction::Consumed
            }
            Key::Escape => {
                self.dismiss();
                InterpreterAction::Consumed
            }
            Key::Tab | Key::Enter => match self.selected().cloned() {
                Some(suggestion) => self.commit(&state, suggestion),
                None if key == Key::Tab => InterpreterAction::Consumed,
                None => InterpreterAction::PassThrough,
            },
        }
    }

    fn commit(&mut self, state: &CommandEntryState, suggestion: Suggestion) -> InterpreterAction {
        match state {
            CommandEntryState::SelectingCommand { .. } => {
                let input = format!("/{} ", suggestion.value);
                let takes_argument = find_argument_command(&suggestion.value).is_some();
                if takes_argument {
                    self.update_input(&input);
                } else {
                    self.dismiss();
                }
                debug!(
                    "[CommandInterpreter] Committed command: {} (argument: {})",
                    suggestion.value, takes_argument
                );
                InterpreterAction::Rewrite {
                    input,
                    commit: Commit::Command(suggestion.value),
                }
            }
            CommandEntryState::SelectingArgument { command, kind, .. } => {
                let input = format!("/{} {} ", command, suggestion.value);
                let chosen = CommandEntryState::ArgumentChosen {
                    command: command.clone(),
                    kind: *kind,
                    value: suggestion.value.clone(),
                };
                self.chosen = Some((input.clone(), chosen));
                self.update_input(&input);
                debug!(
                    "[CommandInterpreter] Committed argument: /{} {}",
                    command, suggestion.value
                );
                InterpreterAction::Rewrite {
                    input,
                    commit: Commit::Argument {
                        command: command.clone(),
                        kind: *kind,
                        value: suggestion.value,
                    },
                }
            }
            // Never have suggestions.
            CommandEntryState::ArgumentChosen { .. } | CommandEntryState::AwaitingText { .. } => {
                InterpreterAction::PassThrough
            }
        }
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
        self.chosen = None;
        self.mode = InputMode::Normal;
        self.suggestions.clear();
        self.selected = 0;
    }

    fn suggest(&self, state: &CommandEntryState) -> Vec<Suggestion> {
        match state {
            CommandEntryState::SelectingCommand { query } => self
                .registry
                .iter()
                .filter(|command| command.matches_prefix(query))
                .take(self.limit)
                .map(|command| Suggestion {
                    value: command.command_name.clone(),
                    description: command.description.clone(),
                })
                .collect(),
            CommandEntryState::SelectingArgument { command, kind, query } => {
                let query = query.to_lowercase();
                let usage = find_argument_command(command)
                    .map(|c| c.usage)
                    .unwrap_or_default();
                self.context
                    .candidates(*kind)
                    .iter()
                    .filter(|candidate| candidate.to_lowercase().starts_with(&query))
                    .take(self.limit)
                    .map(|candidate| Suggestion {
                        value: candidate.clone(),
                        description: usage.to_string(),
                    })
                    .collect()
            }
            CommandEntryState::ArgumentChosen { .. } | CommandEntryState::AwaitingText { .. } => {
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "interpreter_test.rs"]
mod tests;

//! Input modes of the prompt.

use agentdeck_core::slash_command::ArgumentKind;
use serde::Serialize;

/// Sub-state of command entry.
///
/// The variants are mutually exclusive, so "selecting a command while also
/// selecting an argument" cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommandEntryState {
    /// Typing the command name; `query` is what follows the `/`, lowercased.
    SelectingCommand { query: String },
    /// Typing the argument of an argument-taking command.
    SelectingArgument {
        command: String,
        kind: ArgumentKind,
        query: String,
    },
    /// An argument was committed from the suggestions; whatever follows it
    /// is free text. Only the interpreter enters this state, never `parse`.
    ArgumentChosen {
        command: String,
        kind: ArgumentKind,
        value: String,
    },
    /// A command without a structured argument is followed by free text.
    AwaitingText { command: String },
}

impl CommandEntryState {
    /// Derives the entry state from the raw input.
    ///
    /// Returns `None` when the input does not start with `/`.
    pub fn parse(input: &str) -> Option<Self> {
        let body = input.strip_prefix('/')?;
        let Some(split) = body.find(char::is_whitespace) else {
            return Some(Self::SelectingCommand {
                query: body.to_lowercase(),
            });
        };

        let command = body[..split].to_lowercase();
        let rest = body[split..].trim();
        match agentdeck_core::slash_command::find_argument_command(&command) {
            Some(argument) => Some(Self::SelectingArgument {
                command,
                kind: argument.kind,
                query: rest.to_string(),
            }),
            None => Some(Self::AwaitingText { command }),
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            Self::SelectingCommand { .. } => None,
            Self::SelectingArgument { command, .. }
            | Self::ArgumentChosen { command, .. }
            | Self::AwaitingText { command } => Some(command),
        }
    }
}

/// Mode of the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum InputMode {
    /// Free text; arrow keys browse history.
    #[default]
    Normal,
    /// The input starts with `/`.
    CommandEntry(CommandEntryState),
}

impl InputMode {
    pub fn is_command_entry(&self) -> bool {
        matches!(self, Self::CommandEntry(_))
    }

    pub fn entry_state(&self) -> Option<&CommandEntryState> {
        match self {
            Self::CommandEntry(state) => Some(state),
            Self::Normal => None,
        }
    }
}

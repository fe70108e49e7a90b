//! rustyline helper driven by the slash-command interpreter.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::{Mutex, PoisonError};

use agentdeck_application::command::CommandInterpreter;
use agentdeck_application::{CommandContext, CommandEntryState};
use agentdeck_core::slash_command::SlashCommand;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
pub struct ReplHelper {
    interpreter: Mutex<CommandInterpreter>,
}

impl ReplHelper {
    pub fn new(limit: usize, registry: Vec<SlashCommand>, context: CommandContext) -> Self {
        let mut interpreter = CommandInterpreter::new(limit);
        interpreter.set_registry(registry);
        interpreter.set_context(context);
        Self {
            interpreter: Mutex::new(interpreter),
        }
    }

    fn candidates(&self, line: &str) -> Vec<Pair> {
        let mut interpreter = self
            .interpreter
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        candidates(&mut interpreter, line)
    }
}

/// Full-line replacements for the suggestions of `line`.
fn candidates(interpreter: &mut CommandInterpreter, line: &str) -> Vec<Pair> {
    interpreter.update_input(line);
    let Some(state) = interpreter.mode().entry_state().cloned() else {
        return Vec::new();
    };

    interpreter
        .suggestions()
        .iter()
        .filter_map(|suggestion| {
            let replacement = match &state {
                CommandEntryState::SelectingCommand { .. } => format!("/{} ", suggestion.value),
                CommandEntryState::SelectingArgument { command, .. } => {
                    format!("/{} {} ", command, suggestion.value)
                }
                CommandEntryState::ArgumentChosen { .. }
                | CommandEntryState::AwaitingText { .. } => return None,
            };
            let display = if suggestion.description.is_empty() {
                suggestion.value.clone()
            } else {
                format!("{:<18} {}", suggestion.value, suggestion.description)
            };
            Some(Pair {
                display,
                replacement,
            })
        })
        .collect()
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok((0, self.candidates(&line[..pos])))
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else if line.starts_with(':') {
            Owned(line.bright_magenta().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') {
            return None;
        }
        self.candidates(line)
            .into_iter()
            .next()
            .and_then(|pair| pair.replacement.strip_prefix(line).map(str::to_string))
            .filter(|rest| !rest.is_empty())
    }
}

impl Validator for ReplHelper {}

//! Slash-command entry.

pub mod interpreter;
pub mod state;

pub use interpreter::{
    Commit, CommandContext, CommandInterpreter, InterpreterAction, Key, Suggestion,
};
pub use state::{CommandEntryState, InputMode};

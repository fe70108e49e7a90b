//! Slash command definitions.
//!
//! The command registry itself is owned by the backend and fetched at
//! runtime. This module holds the registry entry type, the small builtin
//! table of commands that take a structured argument, and the request and
//! response payloads for executing a command.

pub mod argument;
pub mod model;
pub mod request;

pub use argument::{ArgumentCommand, ArgumentKind, argument_commands, find_argument_command};
pub use model::SlashCommand;
pub use request::{SlashCommandRequest, SlashCommandResponse};

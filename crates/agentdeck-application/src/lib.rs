//! Application layer for agentdeck.
//!
//! Coordinates the playground session: which agent and thread are active,
//! how messages travel to the backend, and how the prompt interprets slash
//! commands and history. Front ends drive everything through
//! [`PlaygroundController`].

pub mod command;
pub mod controller;
pub mod debounce;
pub mod history;
pub mod reconcile;
pub mod session;
pub mod thread_sync;
pub mod transport;

#[cfg(test)]
mod testing;

pub use command::{CommandContext, CommandEntryState, InputMode, Key, Suggestion};
pub use controller::{ActionHandler, ControllerEvent, KeyOutcome, PlaygroundController, SubmitOutcome};
pub use session::{SessionState, SessionStore};
pub use thread_sync::{LoadOutcome, ThreadSynchronizer};
pub use transport::{SendOutcome, TransportMediator};

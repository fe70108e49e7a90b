//! Domain layer for agentdeck.
//!
//! Models, ports and the shared error type of the playground session
//! controller. Nothing in this crate performs I/O.

pub mod api;
pub mod config;
pub mod error;
pub mod ids;
pub mod message;
pub mod response;
pub mod slash_command;
pub mod streaming;
pub mod thread;

// Re-export common types
pub use api::PlaygroundApi;
pub use error::{DeckError, Result};
pub use ids::{AgentId, ClientMessageId, MessageId, ServerMessageId, ThreadId};
pub use message::{Message, MessageRole, WireMessage};
pub use streaming::{ConnectionState, StreamEvent, StreamingChannel};
pub use thread::{AgentRef, Thread, ThreadDetail};

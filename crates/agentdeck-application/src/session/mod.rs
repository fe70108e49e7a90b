//! Session state and its store.

pub mod state;
pub mod store;

pub use state::{InputBuffer, ReplyScope, SessionState, StreamingMessage};
pub use store::SessionStore;

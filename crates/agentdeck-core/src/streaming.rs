//! Streaming transport port.
//!
//! A streaming channel is a persistent connection that delivers a reply as
//! incremental fragments followed by a single completion event.

use crate::ids::{AgentId, ThreadId};
use crate::message::WireMessage;
use crate::response::ResponseMetadata;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Connection state of a streaming channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Events emitted by a streaming channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of the reply under construction; appended to the buffer.
    Partial {
        thread_id: Option<ThreadId>,
        content: String,
    },
    /// The reply is complete.
    Complete {
        thread_id: Option<ThreadId>,
        /// Final message; when absent the accumulated fragments are the reply.
        message: Option<WireMessage>,
        metadata: ResponseMetadata,
    },
    /// The reply failed.
    Error {
        thread_id: Option<ThreadId>,
        message: String,
    },
    /// The connection state changed.
    Connection(ConnectionState),
}

impl StreamEvent {
    /// Thread the event belongs to, if the backend said.
    pub fn thread_id(&self) -> Option<&ThreadId> {
        match self {
            Self::Partial { thread_id, .. }
            | Self::Complete { thread_id, .. }
            | Self::Error { thread_id, .. } => thread_id.as_ref(),
            Self::Connection(_) => None,
        }
    }
}

/// A persistent streaming connection to the backend.
pub trait StreamingChannel: Send + Sync {
    /// Whether the channel is currently connected.
    fn is_connected(&self) -> bool;

    /// Dispatches a message.
    ///
    /// Returns `true` when the channel accepted the send. Acceptance says
    /// nothing about whether the reply will succeed.
    fn send(&self, agent_id: &AgentId, text: &str, thread_id: Option<&ThreadId>) -> bool;

    /// Subscribes to reply and connection events.
    fn subscribe(&self) -> broadcast::Receiver<StreamEvent>;
}

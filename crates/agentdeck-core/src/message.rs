//! Conversation message types.
//!
//! This module contains the in-memory `Message` used by the controller and
//! the `WireMessage` shape the backend sends. Wire messages always carry
//! server identifiers; optimistic messages are created locally with client
//! identifiers and swapped out during reconciliation.

use crate::ids::{ClientMessageId, MessageId, ServerMessageId};
use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the agent.
    Assistant,
}

/// A single chat turn.
///
/// Authorship (`role`) is fixed at creation. Only the edit, bookmark and
/// delete operations issued back to the backend change a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Identity in the client or server identifier space.
    pub id: MessageId,
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
    /// Optional synthesized audio for the message.
    pub audio_url: Option<String>,
    pub is_edited: bool,
    pub is_bookmarked: bool,
}

impl Message {
    /// Creates an optimistic user message with a fresh client identifier.
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self::optimistic(MessageRole::User, content)
    }

    /// Creates an optimistic message of any role with a fresh client identifier.
    pub fn optimistic(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::Client(ClientMessageId::generate()),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            audio_url: None,
            is_edited: false,
            is_bookmarked: false,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.id.is_confirmed()
    }

    /// Compares everything the user can see, ignoring identity.
    pub fn same_content(&self, other: &Message) -> bool {
        self.role == other.role && self.content == other.content
    }
}

/// Message as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub message_id: ServerMessageId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Self {
            id: MessageId::Server(wire.message_id),
            role: wire.role,
            content: wire.content,
            timestamp: wire.timestamp,
            audio_url: wire.audio_url,
            is_edited: wire.is_edited,
            is_bookmarked: wire.is_bookmarked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_defaults() {
        let wire: WireMessage = serde_json::from_str(
            r#"{"message_id": 12, "role": "assistant", "content": "hi"}"#,
        )
        .unwrap();
        let message = Message::from(wire);
        assert!(message.is_confirmed());
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(!message.is_bookmarked);
        assert_eq!(message.id.to_string(), "12");
    }

    #[test]
    fn test_optimistic_messages_are_unconfirmed_and_unique() {
        let a = Message::optimistic_user("hello");
        let b = Message::optimistic_user("hello");
        assert!(!a.is_confirmed());
        assert_ne!(a.id, b.id);
        assert!(a.same_content(&b));
    }
}

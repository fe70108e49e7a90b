//! Identifier newtypes.
//!
//! The backend is free to hand out numeric or string identifiers, so every
//! server-assigned id deserializes from either form and is kept as a string.
//! Optimistic messages use a separate client identifier space so the two can
//! never be confused.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

macro_rules! server_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }
    };
}

server_id!(
    /// Identifier of an agent configured on the backend.
    AgentId
);

server_id!(
    /// Server-assigned thread identifier.
    ThreadId
);

server_id!(
    /// Server-assigned message identifier, required for edit/delete/bookmark.
    ServerMessageId
);

/// Identifier generated locally for an optimistic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientMessageId(Uuid);

impl ClientMessageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientMessageId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for ClientMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Identity of a message in either identifier space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "space", content = "id", rename_all = "snake_case")]
pub enum MessageId {
    /// Rendered optimistically, not yet confirmed by the backend.
    Client(ClientMessageId),
    /// Confirmed by the backend.
    Server(ServerMessageId),
}

impl MessageId {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    pub fn server_id(&self) -> Option<&ServerMessageId> {
        match self {
            Self::Server(id) => Some(id),
            Self::Client(_) => None,
        }
    }

    pub fn client_id(&self) -> Option<ClientMessageId> {
        match self {
            Self::Client(id) => Some(*id),
            Self::Server(_) => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(id) => id.fmt(f),
            Self::Server(id) => id.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_accepts_numbers_and_strings() {
        let numeric: ThreadId = serde_json::from_str("7").unwrap();
        let text: ThreadId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(numeric, text);
        assert_eq!(numeric.as_str(), "7");
    }

    #[test]
    fn test_thread_id_serializes_as_plain_string() {
        let id = ThreadId::from(9);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"9\"");
    }

    #[test]
    fn test_message_id_spaces_are_distinct() {
        let client = MessageId::Client(ClientMessageId::generate());
        let server = MessageId::Server(ServerMessageId::new("m-1"));
        assert!(!client.is_confirmed());
        assert!(server.is_confirmed());
        assert_eq!(server.server_id().map(|id| id.as_str()), Some("m-1"));
        assert!(client.server_id().is_none());
    }
}

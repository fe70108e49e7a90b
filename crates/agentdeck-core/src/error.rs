//! Error types for the agentdeck controller.

use thiserror::Error;

/// A shared error type for every agentdeck crate.
///
/// Variants follow the failure taxonomy of the playground controller:
/// transport failures are retryable banners, cancellations are silent,
/// malformed responses clear the message view, and command failures keep
/// the user's input for correction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeckError {
    /// Network or HTTP failure talking to the backend
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with an explicit error
    #[error("Backend error{}: {message}", code_suffix(.code))]
    Backend {
        code: Option<String>,
        message: String,
    },

    /// The backend answered, but the payload is unusable
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request was superseded or aborted; never shown to the user
    #[error("Request cancelled")]
    Cancelled,

    /// A slash command could not be executed
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// An operation was requested in a state that cannot serve it
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

impl DeckError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Backend error
    pub fn backend(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            code,
            message: message.into(),
        }
    }

    /// Creates a MalformedResponse error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Creates a CommandFailed error
    pub fn command(message: impl Into<String>) -> Self {
        Self::CommandFailed(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this error describes an unusable thread payload.
    ///
    /// Both explicit backend error codes and structurally broken responses
    /// count, since either way the message view must not be trusted.
    pub fn is_thread_load_failure(&self) -> bool {
        matches!(self, Self::MalformedResponse(_) | Self::Backend { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Text suitable for an error banner.
    ///
    /// Backend errors show the backend's own message rather than the
    /// decorated `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            Self::CommandFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DeckError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for DeckError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DeckError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DeckError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, DeckError>`.
pub type Result<T> = std::result::Result<T, DeckError>;

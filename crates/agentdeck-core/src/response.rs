//! Response payloads shared by both transports.
//!
//! The synchronous HTTP response and the streaming completion frame carry
//! the same optional extras: a thread auto-rename notice and a special
//! action. `ResponseMetadata` is the normalized form of those extras so the
//! mediator can treat both transports alike.

use crate::ids::{AgentId, ThreadId};
use crate::message::WireMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Side effects requested by the backend outside the messaging contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResponseAction {
    /// The conversation entered a project session.
    ProjectEntered {
        project_name: Option<String>,
        data: Option<Value>,
    },
    /// The conversation left its project session.
    ProjectExited,
    /// The memory manager should be opened.
    OpenMemoryManager,
    /// The user should be switched to another agent.
    SwitchAgent { agent_id: Option<AgentId> },
    /// An action this client does not know; surfaced rather than dropped.
    Unrecognized { name: String, data: Option<Value> },
}

impl ResponseAction {
    /// Decodes the `action` name and optional `data` object of a response.
    pub fn decode(name: &str, data: Option<&Value>) -> Option<Self> {
        let field = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match name {
            "" => None,
            "project_entered" => Some(Self::ProjectEntered {
                project_name: field("project_name").or_else(|| field("name")),
                data: data.cloned(),
            }),
            "project_exited" => Some(Self::ProjectExited),
            "open_memory_manager" => Some(Self::OpenMemoryManager),
            "switch_agent" => Some(Self::SwitchAgent {
                agent_id: data
                    .and_then(|d| d.get("agent_id"))
                    .and_then(|v| serde_json::from_value(v.clone()).ok()),
            }),
            other => Some(Self::Unrecognized {
                name: other.to_string(),
                data: data.cloned(),
            }),
        }
    }
}

/// Payload of `sendMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

/// Result of the synchronous `sendMessage` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// "success" or "error"
    #[serde(default)]
    pub status: String,
    /// The assistant reply
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub thread_renamed: bool,
    #[serde(default)]
    pub new_thread_title: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl SendMessageResponse {
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error") || self.error.is_some()
    }

    /// Extracts the transport-independent extras.
    pub fn metadata(&self) -> ResponseMetadata {
        ResponseMetadata {
            thread_renamed: self.thread_renamed,
            new_thread_title: self.new_thread_title.clone(),
            action: self.action.clone(),
            data: self.data.clone(),
        }
    }
}

/// Extras attached to a completed reply, whichever transport delivered it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub thread_renamed: bool,
    #[serde(default)]
    pub new_thread_title: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ResponseMetadata {
    /// The new title when the backend renamed the thread.
    pub fn renamed_title(&self) -> Option<&str> {
        if !self.thread_renamed {
            return None;
        }
        self.new_thread_title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    pub fn response_action(&self) -> Option<ResponseAction> {
        self.action
            .as_deref()
            .and_then(|action| ResponseAction::decode(action, self.data.as_ref()))
    }
}

//! Slash command execution payloads.

use crate::ids::{AgentId, ThreadId};
use crate::response::ResponseAction;
use serde::{Deserialize, Serialize};

/// Payload of `executeSlashCommand`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlashCommandRequest {
    /// The raw command text, including the leading `/`
    pub message: String,
    pub agent_id: AgentId,
    /// Channel the command originates from (e.g. "playground")
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
}

/// Result of `executeSlashCommand`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlashCommandResponse {
    /// Text to show as the command's reply
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SlashCommandResponse {
    /// Decodes the action/data pair into a typed action, if recognized.
    pub fn response_action(&self) -> Option<ResponseAction> {
        self.action
            .as_deref()
            .and_then(|action| ResponseAction::decode(action, self.data.as_ref()))
    }
}

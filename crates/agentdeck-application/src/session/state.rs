//! Observable session state.

use crate::command::{InputMode, Suggestion};
use agentdeck_core::ids::{ClientMessageId, MessageId, ServerMessageId, ThreadId};
use agentdeck_core::message::{Message, MessageRole};
use agentdeck_core::streaming::ConnectionState;
use agentdeck_core::thread::{AgentRef, Thread};
use serde::Serialize;
use std::collections::HashMap;

/// An assistant reply that is still arriving.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingMessage {
    pub id: ClientMessageId,
    pub content: String,
    pub started_at: String,
}

impl StreamingMessage {
    pub fn new() -> Self {
        Self {
            id: ClientMessageId::generate(),
            content: String::new(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Turns the buffer into a finished assistant message.
    pub fn into_message(self) -> Message {
        Message {
            id: MessageId::Client(self.id),
            role: MessageRole::Assistant,
            content: self.content,
            timestamp: self.started_at,
            audio_url: None,
            is_edited: false,
            is_bookmarked: false,
        }
    }
}

impl Default for StreamingMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// The agent selection and thread a send started on.
///
/// A reply is only delivered while both are still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyScope {
    pub epoch: u64,
    pub thread_id: Option<ThreadId>,
}

impl ReplyScope {
    pub fn capture(state: &SessionState) -> Self {
        Self {
            epoch: state.agent_epoch,
            thread_id: state.active_thread_id().cloned(),
        }
    }

    pub fn holds(&self, state: &SessionState) -> bool {
        state.agent_epoch == self.epoch && state.active_thread_id() == self.thread_id.as_ref()
    }
}

/// Prompt text with its caret, counted in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputBuffer {
    pub text: String,
    pub caret: usize,
}

impl InputBuffer {
    /// Replaces the text and moves the caret to the end.
    pub fn replace(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.caret = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.replace(String::new());
    }
}

/// Everything the renderer needs.
///
/// `messages` only ever holds messages of `active_thread`. While a reply
/// streams, its text lives in `streaming_message` and not in `messages`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub selected_agent: Option<AgentRef>,
    /// Bumped on every agent selection; async work started for an older
    /// epoch is discarded.
    pub agent_epoch: u64,
    pub active_thread: Option<Thread>,
    pub threads: Vec<Thread>,
    pub messages: Vec<Message>,
    pub streaming_message: Option<StreamingMessage>,
    pub input: InputBuffer,
    pub input_mode: InputMode,
    pub suggestions: Vec<Suggestion>,
    pub selected_suggestion: usize,
    /// General error banner
    pub error: Option<String>,
    /// Set when a thread could not be loaded; distinct from "no messages yet"
    pub thread_load_error: Option<String>,
    /// Set when a slash command failed
    pub command_error: Option<String>,
    pub is_loading_thread: bool,
    pub is_sending: bool,
    pub connection: ConnectionState,
    /// Confirmed identities of optimistic messages
    #[serde(skip)]
    pub id_map: HashMap<ClientMessageId, ServerMessageId>,
}

impl SessionState {
    pub fn active_thread_id(&self) -> Option<&ThreadId> {
        self.active_thread.as_ref().and_then(|t| t.id.as_ref())
    }

    pub fn is_active_thread(&self, thread_id: &ThreadId) -> bool {
        self.active_thread_id() == Some(thread_id)
    }

    /// Server identity of a message, following the id map for optimistic ones.
    pub fn resolve_server_id(&self, id: &MessageId) -> Option<ServerMessageId> {
        match id {
            MessageId::Server(id) => Some(id.clone()),
            MessageId::Client(id) => self.id_map.get(id).cloned(),
        }
    }

    /// Index of a message in `messages`, matching either identity.
    pub fn position_of(&self, id: &MessageId) -> Option<usize> {
        let server_id = self.resolve_server_id(id);
        self.messages.iter().position(|message| {
            &message.id == id
                || server_id
                    .as_ref()
                    .is_some_and(|server_id| message.id.server_id() == Some(server_id))
        })
    }

    /// Replaces a thread in the list and, when active, the active thread.
    pub fn upsert_thread(&mut self, thread: Thread) {
        if let Some(id) = thread.id.as_ref() {
            if let Some(active) = self.active_thread.as_mut()
                && active.id.as_ref() == Some(id)
            {
                *active = thread.clone();
            }
            if let Some(existing) = self
                .threads
                .iter_mut()
                .find(|t| t.id.as_ref() == Some(id))
            {
                *existing = thread;
                return;
            }
        }
        self.threads.insert(0, thread);
    }

    /// Keeps the active thread's message count in line with `messages`.
    pub(crate) fn sync_message_count(&mut self) {
        let count = u32::try_from(self.messages.len()).unwrap_or(u32::MAX);
        let Some(active) = self.active_thread.as_mut() else {
            return;
        };
        active.message_count = count;
        let id = active.id.clone();
        if let Some(listed) = self
            .threads
            .iter_mut()
            .find(|t| id.is_some() && t.id == id)
        {
            listed.message_count = count;
        }
    }
}

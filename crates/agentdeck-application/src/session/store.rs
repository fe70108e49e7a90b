//! The single owner of [`SessionState`].
//!
//! Every mutation goes through [`SessionStore::update`], which applies the
//! change synchronously and then notifies observers. A mutation therefore
//! never interleaves with another one, and observers always see a state in
//! which every invariant holds.

use super::state::{ReplyScope, SessionState, StreamingMessage};
use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::ClientMessageId;
use agentdeck_core::message::Message;
use agentdeck_core::streaming::ConnectionState;
use agentdeck_core::thread::{AgentRef, Thread};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Reads the current state without cloning it.
    ///
    /// The closure must not call back into the store.
    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Applies a mutation and notifies observers.
    pub fn update(&self, f: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(f);
    }

    /// Switches agent and clears all agent-scoped state in one step.
    ///
    /// Returns the new agent epoch.
    pub fn select_agent(&self, agent: AgentRef) -> u64 {
        let mut epoch = 0;
        self.update(|state| {
            state.agent_epoch += 1;
            epoch = state.agent_epoch;
            state.selected_agent = Some(agent);
            state.active_thread = None;
            state.threads.clear();
            state.messages.clear();
            state.streaming_message = None;
            state.id_map.clear();
            state.error = None;
            state.thread_load_error = None;
            state.command_error = None;
            state.is_loading_thread = false;
        });
        epoch
    }

    /// Whether `epoch` is still the current agent selection.
    pub fn is_current_epoch(&self, epoch: u64) -> bool {
        self.read(|state| state.agent_epoch == epoch)
    }

    pub fn selected_agent(&self) -> Option<AgentRef> {
        self.read(|state| state.selected_agent.clone())
    }

    pub fn active_thread(&self) -> Option<Thread> {
        self.read(|state| state.active_thread.clone())
    }

    pub fn push_message(&self, message: Message) {
        self.update(|state| {
            state.messages.push(message);
            state.sync_message_count();
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| state.error = error);
    }

    pub fn set_command_error(&self, error: Option<String>) {
        self.update(|state| state.command_error = error);
    }

    pub fn set_sending(&self, is_sending: bool) {
        self.update(|state| state.is_sending = is_sending);
    }

    pub fn set_connection(&self, connection: ConnectionState) {
        self.update(|state| state.connection = connection);
    }

    /// Starts a fresh streaming buffer and returns its identity.
    pub fn begin_streaming(&self) -> ClientMessageId {
        let streaming = StreamingMessage::new();
        let id = streaming.id;
        self.update(|state| state.streaming_message = Some(streaming));
        id
    }

    pub fn append_streaming(&self, fragment: &str) {
        self.update(|state| {
            if let Some(streaming) = state.streaming_message.as_mut() {
                streaming.content.push_str(fragment);
            }
        });
    }

    /// Moves the streamed reply into `messages`.
    ///
    /// The buffer is cleared in the same mutation that appends the final
    /// message, so the reply is never visible twice. `final_message` wins
    /// over the accumulated fragments when the backend sent one.
    ///
    /// Fails with `Cancelled` when `scope` no longer holds; the buffer is
    /// dropped and nothing is appended.
    pub fn promote_streaming(
        &self,
        scope: &ReplyScope,
        final_message: Option<Message>,
    ) -> Result<Option<Message>> {
        let mut promoted = Err(DeckError::Cancelled);
        self.update(|state| {
            let buffered = state.streaming_message.take();
            if !scope.holds(state) {
                return;
            }
            let message = match (final_message, buffered) {
                (Some(message), _) => message,
                (None, Some(buffered)) => buffered.into_message(),
                (None, None) => {
                    promoted = Ok(None);
                    return;
                }
            };
            state.messages.push(message.clone());
            state.sync_message_count();
            promoted = Ok(Some(message));
        });
        promoted
    }

    /// Appends a reply if `scope` still holds, in one mutation.
    pub fn deliver_reply(&self, scope: &ReplyScope, message: Message) -> Result<()> {
        let mut delivered = Err(DeckError::Cancelled);
        self.update(|state| {
            if scope.holds(state) {
                state.messages.push(message);
                state.sync_message_count();
                delivered = Ok(());
            }
        });
        delivered
    }

    pub fn clear_streaming(&self) {
        self.update(|state| state.streaming_message = None);
    }
}

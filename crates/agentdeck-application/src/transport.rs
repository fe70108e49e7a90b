//! Message delivery over streaming or synchronous HTTP.
//!
//! `TransportMediator` tries the streaming channel first and falls back to
//! the synchronous API when the channel is absent, disconnected or declines
//! the send. Whichever transport delivers the reply, the result is one
//! assistant message in the store plus the normalized response metadata.

use crate::session::{ReplyScope, SessionStore};
use crate::thread_sync::ThreadSynchronizer;
use agentdeck_core::api::PlaygroundApi;
use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::{AgentId, ThreadId};
use agentdeck_core::message::Message;
use agentdeck_core::response::{ResponseAction, ResponseMetadata};
use agentdeck_core::streaming::{ConnectionState, StreamEvent, StreamingChannel};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The assistant replied.
    Reply(Message),
    /// The backend requested a side effect, possibly alongside a reply.
    Action {
        action: ResponseAction,
        reply: Option<Message>,
    },
}

impl SendOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            Self::Reply(message) => Some(message),
            Self::Action { reply, .. } => reply.as_ref(),
        }
    }
}

/// A finished reply before post-processing.
struct Completed {
    message: Option<Message>,
    metadata: ResponseMetadata,
}

pub struct TransportMediator {
    api: Arc<dyn PlaygroundApi>,
    channel: Option<Arc<dyn StreamingChannel>>,
    store: SessionStore,
    synchronizer: Arc<ThreadSynchronizer>,
    /// Serializes sends so replies never interleave.
    in_flight: Mutex<()>,
}

impl TransportMediator {
    pub fn new(
        api: Arc<dyn PlaygroundApi>,
        channel: Option<Arc<dyn StreamingChannel>>,
        store: SessionStore,
        synchronizer: Arc<ThreadSynchronizer>,
    ) -> Self {
        Self {
            api,
            channel,
            store,
            synchronizer,
            in_flight: Mutex::new(()),
        }
    }

    pub fn is_streaming_available(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.is_connected())
    }

    /// Sends `text` as the user and waits for the reply.
    ///
    /// The user's message is shown optimistically once the send starts. On
    /// success the reply is in `messages`, a backend rename has been
    /// applied, and the thread has been reconciled with the server. On
    /// failure the streaming buffer is cleared and the error banner is set.
    ///
    /// A reply that arrives after the user switched agent or thread is
    /// discarded and the send fails with `Cancelled`.
    pub async fn send(
        &self,
        agent_id: &AgentId,
        text: &str,
        thread_id: Option<&ThreadId>,
    ) -> Result<SendOutcome> {
        let _guard = self.in_flight.lock().await;
        let scope = self.store.read(ReplyScope::capture);
        self.store.update(|state| {
            state.messages.push(Message::optimistic_user(text));
            state.sync_message_count();
            state.is_sending = true;
            state.error = None;
        });

        let result = match self.try_stream(agent_id, text, thread_id, &scope).await {
            Some(result) => result,
            None => self.send_sync(agent_id, text, thread_id, &scope).await,
        };
        self.store.set_sending(false);

        let completed = match result {
            Ok(completed) => completed,
            Err(e) if e.is_cancelled() => {
                info!(
                    "[TransportMediator] Discarding reply from {}, the session moved on",
                    agent_id
                );
                return Err(e);
            }
            Err(e) => {
                warn!("[TransportMediator] Send to {} failed: {}", agent_id, e);
                let text = e.user_message();
                self.store.update(|state| {
                    state.streaming_message = None;
                    if scope.holds(state) {
                        state.error = Some(text);
                    }
                });
                return Err(e);
            }
        };

        if let (Some(title), Some(thread_id)) = (completed.metadata.renamed_title(), thread_id) {
            info!(
                "[TransportMediator] Backend renamed thread {} to '{}'",
                thread_id, title
            );
            self.synchronizer.apply_rename(thread_id, title);
        }

        if let Some(origin) = scope.thread_id.as_ref() {
            // Failures are logged by the synchronizer; the optimistic list stays.
            let _ = self.synchronizer.reconcile_after_send(origin).await;
        }

        match completed.metadata.response_action() {
            Some(action) => Ok(SendOutcome::Action {
                action,
                reply: completed.message,
            }),
            None => completed
                .message
                .map(SendOutcome::Reply)
                .ok_or_else(|| DeckError::malformed("Reply contained no message")),
        }
    }

    /// Streams the reply when the channel takes the send.
    ///
    /// Returns `None` when the synchronous fallback should be used.
    async fn try_stream(
        &self,
        agent_id: &AgentId,
        text: &str,
        thread_id: Option<&ThreadId>,
        scope: &ReplyScope,
    ) -> Option<Result<Completed>> {
        let channel = self.channel.as_ref()?;
        if !channel.is_connected() {
            debug!("[TransportMediator] Streaming channel not connected, using HTTP");
            return None;
        }

        // Subscribe first so no fragment sent right after acceptance is missed.
        let mut events = channel.subscribe();
        if !channel.send(agent_id, text, thread_id) {
            debug!("[TransportMediator] Streaming channel declined send, using HTTP");
            return None;
        }
        debug!("[TransportMediator] Streaming reply from {}", agent_id);
        Some(self.consume_stream(&mut events, thread_id, scope).await)
    }

    async fn consume_stream(
        &self,
        events: &mut broadcast::Receiver<StreamEvent>,
        thread_id: Option<&ThreadId>,
        scope: &ReplyScope,
    ) -> Result<Completed> {
        self.store.begin_streaming();
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    // The buffer is missing fragments and cannot be promoted.
                    return Err(DeckError::transport(format!(
                        "Streaming reply lost {} events",
                        skipped
                    )));
                }
                Err(RecvError::Closed) => {
                    return Err(DeckError::transport("Streaming channel closed"));
                }
            };

            if let (Some(expected), Some(actual)) = (thread_id, event.thread_id())
                && expected != actual
            {
                continue;
            }

            match event {
                StreamEvent::Partial { content, .. } => self.store.append_streaming(&content),
                StreamEvent::Complete {
                    message, metadata, ..
                } => {
                    let message = self
                        .store
                        .promote_streaming(scope, message.map(Message::from))?;
                    return Ok(Completed { message, metadata });
                }
                StreamEvent::Error { message, .. } => {
                    return Err(DeckError::backend(None, message));
                }
                StreamEvent::Connection(state) => {
                    self.store.set_connection(state);
                    if state == ConnectionState::Disconnected {
                        return Err(DeckError::transport(
                            "Streaming connection closed before the reply completed",
                        ));
                    }
                }
            }
        }
    }

    async fn send_sync(
        &self,
        agent_id: &AgentId,
        text: &str,
        thread_id: Option<&ThreadId>,
        scope: &ReplyScope,
    ) -> Result<Completed> {
        let response = self.api.send_message(agent_id, text, thread_id).await?;
        if response.is_error() {
            let message = response
                .error
                .clone()
                .unwrap_or_else(|| "The agent returned an error".to_string());
            return Err(DeckError::backend(None, message));
        }

        let metadata = response.metadata();
        let message = response.message.map(Message::from);
        if let Some(message) = message.clone() {
            self.store.deliver_reply(scope, message)?;
        }
        Ok(Completed { message, metadata })
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

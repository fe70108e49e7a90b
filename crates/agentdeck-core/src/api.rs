//! Backend API port.
//!
//! Defines the interface the controller uses to reach the agent platform.

use crate::error::Result;
use crate::ids::{AgentId, ServerMessageId, ThreadId};
use crate::response::SendMessageResponse;
use crate::slash_command::{SlashCommand, SlashCommandRequest, SlashCommandResponse};
use crate::thread::{NewThread, Thread, ThreadDetail, ThreadList, ThreadUpdate};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// An abstract client for the agent platform's REST API.
///
/// This trait decouples the playground controller from the concrete
/// transport (HTTP in production, in-memory fakes in tests).
///
/// # Implementation Notes
///
/// Implementations should:
/// - Map network failures to `DeckError::Transport`
/// - Map explicit backend errors to `DeckError::Backend`
/// - Return `DeckError::Cancelled` from `get_thread` once `cancel` fires
#[async_trait]
pub trait PlaygroundApi: Send + Sync {
    /// Lists the threads of an agent.
    async fn list_threads(&self, agent_id: &AgentId) -> Result<ThreadList>;

    /// Creates a thread.
    ///
    /// # Returns
    ///
    /// The created thread with its server-assigned id.
    async fn create_thread(&self, request: &NewThread) -> Result<Thread>;

    /// Loads a thread with its messages.
    ///
    /// # Arguments
    ///
    /// * `thread_id` - The thread to load
    /// * `cancel` - Fires when a newer load supersedes this one
    ///
    /// # Returns
    ///
    /// - `Ok(ThreadDetail)`: Response received; may still carry an error code
    /// - `Err(DeckError::Cancelled)`: The load was aborted
    /// - `Err(_)`: Transport or decoding failure
    async fn get_thread(&self, thread_id: &ThreadId, cancel: CancellationToken)
    -> Result<ThreadDetail>;

    /// Updates a thread's title and/or archived flag.
    async fn update_thread(&self, thread_id: &ThreadId, update: &ThreadUpdate) -> Result<Thread>;

    /// Deletes a thread and all of its messages.
    async fn delete_thread(&self, thread_id: &ThreadId) -> Result<()>;

    /// Sends a message synchronously and waits for the full reply.
    async fn send_message(
        &self,
        agent_id: &AgentId,
        text: &str,
        thread_id: Option<&ThreadId>,
    ) -> Result<SendMessageResponse>;

    /// Executes a slash command.
    async fn execute_slash_command(
        &self,
        request: &SlashCommandRequest,
    ) -> Result<SlashCommandResponse>;

    /// Lists the command registry.
    async fn list_slash_commands(&self) -> Result<Vec<SlashCommand>>;

    /// Leaves the project session bound to an agent, if any.
    ///
    /// Having no active project session is not an error.
    async fn exit_project_session(&self, agent_id: &AgentId) -> Result<()>;

    /// Deletes a message and every later message of the thread.
    async fn delete_message(&self, thread_id: &ThreadId, message_id: &ServerMessageId)
    -> Result<()>;

    /// Sets or clears the bookmark flag of a message.
    async fn set_bookmark(
        &self,
        thread_id: &ThreadId,
        message_id: &ServerMessageId,
        bookmarked: bool,
    ) -> Result<()>;
}

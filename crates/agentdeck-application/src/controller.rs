//! Playground controller facade.
//!
//! `PlaygroundController` is the single entry point a front end talks to. It
//! wires the thread synchronizer, the transport mediator, the command
//! interpreter and the prompt history around one [`SessionStore`], and turns
//! key presses and submits into the right operation.
//!
//! Front ends observe state through [`PlaygroundController::subscribe`] and
//! discrete happenings (completions, backend actions) through
//! [`PlaygroundController::subscribe_events`].

use crate::command::{
    Commit, CommandContext, CommandInterpreter, InterpreterAction, Key, Suggestion,
};
use crate::history::{HistoryNavigator, Recall};
use crate::session::{ReplyScope, SessionState, SessionStore};
use crate::thread_sync::{LoadOutcome, ThreadSynchronizer};
use crate::transport::{SendOutcome, TransportMediator};
use agentdeck_core::api::PlaygroundApi;
use agentdeck_core::config::PlaygroundConfig;
use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::{AgentId, MessageId, ThreadId};
use agentdeck_core::message::{Message, MessageRole};
use agentdeck_core::response::ResponseAction;
use agentdeck_core::slash_command::{ArgumentKind, SlashCommand, SlashCommandRequest};
use agentdeck_core::streaming::StreamingChannel;
use agentdeck_core::thread::{AgentRef, Thread};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Discrete controller notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A tool was picked from the `/tool` suggestions.
    ToolSelected { name: String },
    /// An agent was picked from `/invoke` or `/switch` suggestions.
    AgentChosen { command: String, name: String },
    /// A slash command ran successfully.
    CommandExecuted { command: String },
    /// The backend requested a side effect.
    Action(ResponseAction),
}

/// Side effects requested by the backend.
///
/// Every method defaults to doing nothing; front ends override what they
/// support.
pub trait ActionHandler: Send + Sync {
    fn project_entered(&self, _project_name: Option<&str>, _data: Option<&Value>) {}

    fn project_exited(&self) {}

    fn open_memory_manager(&self) {}

    fn switch_agent(&self, _agent_id: Option<&AgentId>) {}

    fn unrecognized(&self, _name: &str, _data: Option<&Value>) {}
}

/// Result of a key press.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// The key changed the prompt or the suggestion selection.
    Handled,
    /// Enter submitted the input.
    Submitted(SubmitOutcome),
    /// The key has no meaning in the current state.
    Ignored,
}

/// Result of a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The input was blank.
    Empty,
    Sent(SendOutcome),
    /// A slash command ran.
    Command {
        reply: Option<String>,
        action: Option<ResponseAction>,
    },
}

struct InputPipeline {
    interpreter: CommandInterpreter,
    history: HistoryNavigator,
}

pub struct PlaygroundController {
    store: SessionStore,
    api: Arc<dyn PlaygroundApi>,
    synchronizer: Arc<ThreadSynchronizer>,
    mediator: TransportMediator,
    input: Mutex<InputPipeline>,
    events: broadcast::Sender<ControllerEvent>,
    action_handler: Option<Arc<dyn ActionHandler>>,
    channel_name: String,
}

impl PlaygroundController {
    pub fn new(
        api: Arc<dyn PlaygroundApi>,
        streaming: Option<Arc<dyn StreamingChannel>>,
        config: &PlaygroundConfig,
    ) -> Self {
        let store = SessionStore::new();
        let synchronizer = Arc::new(ThreadSynchronizer::new(
            api.clone(),
            store.clone(),
            config,
        ));
        let mediator = TransportMediator::new(
            api.clone(),
            streaming,
            store.clone(),
            synchronizer.clone(),
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            store,
            api,
            synchronizer,
            mediator,
            input: Mutex::new(InputPipeline {
                interpreter: CommandInterpreter::new(config.suggestion_limit),
                history: HistoryNavigator::new(),
            }),
            events,
            action_handler: None,
            channel_name: config.channel.clone(),
        }
    }

    pub fn with_action_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.action_handler = Some(handler);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn is_streaming_available(&self) -> bool {
        self.mediator.is_streaming_available()
    }

    // ------------------------------------------------------------------
    // Agents and threads
    // ------------------------------------------------------------------

    pub async fn select_agent(&self, agent: AgentRef) -> Result<Thread> {
        info!("[PlaygroundController] Switching to agent {}", agent.name);
        self.synchronizer.initialize_for_agent(agent).await
    }

    pub async fn select_thread(&self, thread_id: ThreadId) -> Result<LoadOutcome> {
        self.synchronizer.select_thread(thread_id).await
    }

    pub async fn new_thread(&self, title: Option<String>) -> Result<Thread> {
        self.synchronizer.create_thread(title).await
    }

    pub async fn rename_thread(&self, thread_id: &ThreadId, title: &str) -> Result<Thread> {
        self.synchronizer.rename_thread(thread_id, title).await
    }

    pub async fn archive_thread(&self, thread_id: &ThreadId, archived: bool) -> Result<Thread> {
        self.synchronizer.archive_thread(thread_id, archived).await
    }

    pub async fn delete_thread(&self, thread_id: &ThreadId) -> Result<()> {
        self.synchronizer.delete_thread(thread_id).await
    }

    pub async fn delete_message(&self, message_id: &MessageId) -> Result<()> {
        self.synchronizer.delete_message(message_id).await
    }

    pub async fn set_bookmark(&self, message_id: &MessageId, bookmarked: bool) -> Result<()> {
        self.synchronizer.set_bookmark(message_id, bookmarked).await
    }

    /// Re-lists threads after a short quiet period.
    pub fn request_thread_refresh(&self) {
        self.synchronizer.schedule_refresh();
    }

    pub fn dismiss_error(&self) {
        self.store.update(|state| {
            state.error = None;
            state.command_error = None;
        });
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Fetches the command registry used for suggestions.
    pub async fn load_commands(&self) -> Result<usize> {
        let commands = self.api.list_slash_commands().await.map_err(|e| {
            warn!("[PlaygroundController] Failed to load slash commands: {}", e);
            e
        })?;
        let count = commands.len();
        let mut pipeline = self.input.lock().await;
        pipeline.interpreter.set_registry(commands);
        self.refresh_prompt(&mut pipeline);
        Ok(count)
    }

    /// The registry loaded by [`Self::load_commands`].
    pub async fn commands(&self) -> Vec<SlashCommand> {
        self.input.lock().await.interpreter.registry().to_vec()
    }

    /// Sets the candidate lists of argument-taking commands.
    pub async fn set_command_context(&self, context: CommandContext) {
        let mut pipeline = self.input.lock().await;
        pipeline.interpreter.set_context(context);
        self.refresh_prompt(&mut pipeline);
    }

    // ------------------------------------------------------------------
    // Prompt
    // ------------------------------------------------------------------

    /// Replaces the prompt text, as typing does.
    pub async fn set_input(&self, text: &str) {
        let mut pipeline = self.input.lock().await;
        self.store.update(|state| state.input.replace(text));
        self.refresh_prompt(&mut pipeline);
    }

    /// Routes a key press to the interpreter, the history or submit.
    pub async fn handle_key(&self, key: Key) -> Result<KeyOutcome> {
        {
            let mut pipeline = self.input.lock().await;
            match pipeline.interpreter.handle_key(key) {
                InterpreterAction::Rewrite { input, commit } => {
                    self.store.update(|state| state.input.replace(input));
                    self.refresh_prompt(&mut pipeline);
                    self.announce_commit(commit);
                    return Ok(KeyOutcome::Handled);
                }
                InterpreterAction::Consumed => {
                    self.publish_prompt(&pipeline.interpreter);
                    return Ok(KeyOutcome::Handled);
                }
                InterpreterAction::PassThrough => {}
            }

            let recall = match key {
                Key::Up => pipeline.history.previous(),
                Key::Down => pipeline.history.next(),
                Key::Enter => None,
                Key::Tab | Key::Escape => return Ok(KeyOutcome::Ignored),
            };
            if key != Key::Enter {
                let Some(recall) = recall else {
                    return Ok(KeyOutcome::Ignored);
                };
                let text = match recall {
                    Recall::Show(entry) => entry,
                    Recall::Clear => String::new(),
                };
                self.store.update(|state| state.input.replace(text));
                self.refresh_prompt(&mut pipeline);
                return Ok(KeyOutcome::Handled);
            }
        }

        self.submit().await.map(KeyOutcome::Submitted)
    }

    /// Submits the prompt.
    ///
    /// A registered slash command is executed; anything else, including an
    /// unknown `/word`, is sent to the agent as a message.
    pub async fn submit(&self) -> Result<SubmitOutcome> {
        let text = self.store.read(|state| state.input.text.clone());
        let trimmed = text.trim().to_string();
        if trimmed.is_empty() {
            return Ok(SubmitOutcome::Empty);
        }

        let agent = self
            .store
            .selected_agent()
            .ok_or_else(|| DeckError::invalid_state("No agent selected"))?;
        let thread_id = self.ensure_thread().await?;

        let is_command = {
            let mut pipeline = self.input.lock().await;
            pipeline.history.push(text.clone());
            pipeline.interpreter.recognizes(&text)
        };

        if is_command {
            return self.run_command(&agent, &trimmed, thread_id).await;
        }

        self.clear_prompt().await;
        let outcome = self
            .mediator
            .send(&agent.id, &trimmed, Some(&thread_id))
            .await?;
        if let SendOutcome::Action { action, .. } = &outcome {
            self.dispatch_action(action);
        }
        self.synchronizer.schedule_refresh();
        Ok(SubmitOutcome::Sent(outcome))
    }

    /// The active thread id, creating a thread when there is none.
    async fn ensure_thread(&self) -> Result<ThreadId> {
        if let Some(thread_id) = self.store.read(|state| state.active_thread_id().cloned()) {
            return Ok(thread_id);
        }
        debug!("[PlaygroundController] No active thread, creating one");
        let thread = self.synchronizer.create_thread(None).await?;
        thread
            .id
            .ok_or_else(|| DeckError::malformed("Created thread has no id"))
    }

    async fn run_command(
        &self,
        agent: &AgentRef,
        text: &str,
        thread_id: ThreadId,
    ) -> Result<SubmitOutcome> {
        let command = text
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let request = SlashCommandRequest {
            message: text.to_string(),
            agent_id: agent.id.clone(),
            channel: self.channel_name.clone(),
            thread_id: Some(thread_id),
        };
        self.store.set_command_error(None);
        let scope = self.store.read(ReplyScope::capture);
        debug!("[PlaygroundController] Executing /{}", command);

        let response = match self.api.execute_slash_command(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.command_failed(&command, e.user_message())),
        };
        if let Some(error) = response.error.clone() {
            return Err(self.command_failed(&command, error));
        }

        let mut delivered = false;
        self.store.update(|state| {
            if !scope.holds(state) {
                return;
            }
            state.messages.push(Message::optimistic_user(text));
            if let Some(reply) = response.message.as_deref() {
                state
                    .messages
                    .push(Message::optimistic(MessageRole::Assistant, reply));
            }
            state.sync_message_count();
            delivered = true;
        });
        if !delivered {
            info!(
                "[PlaygroundController] Discarding /{} reply, the session moved on",
                command
            );
            return Err(DeckError::Cancelled);
        }

        self.clear_prompt().await;
        let action = response.response_action();
        self.emit(ControllerEvent::CommandExecuted {
            command: command.clone(),
        });
        if let Some(action) = action.as_ref() {
            self.dispatch_action(action);
        }
        info!("[PlaygroundController] /{} completed", command);

        Ok(SubmitOutcome::Command {
            reply: response.message,
            action,
        })
    }

    /// Shows a command failure; the prompt keeps the command for correction.
    fn command_failed(&self, command: &str, message: String) -> DeckError {
        warn!("[PlaygroundController] /{} failed: {}", command, message);
        self.store.set_command_error(Some(message.clone()));
        DeckError::command(message)
    }

    fn dispatch_action(&self, action: &ResponseAction) {
        debug!("[PlaygroundController] Backend action: {:?}", action);
        if let Some(handler) = self.action_handler.as_ref() {
            match action {
                ResponseAction::ProjectEntered { project_name, data } => {
                    handler.project_entered(project_name.as_deref(), data.as_ref())
                }
                ResponseAction::ProjectExited => handler.project_exited(),
                ResponseAction::OpenMemoryManager => handler.open_memory_manager(),
                ResponseAction::SwitchAgent { agent_id } => handler.switch_agent(agent_id.as_ref()),
                ResponseAction::Unrecognized { name, data } => {
                    handler.unrecognized(name, data.as_ref())
                }
            }
        }
        self.emit(ControllerEvent::Action(action.clone()));
    }

    fn announce_commit(&self, commit: Commit) {
        let Commit::Argument {
            command,
            kind,
            value,
        } = commit
        else {
            return;
        };
        match kind {
            ArgumentKind::Tool => self.emit(ControllerEvent::ToolSelected { name: value }),
            ArgumentKind::Agent => self.emit(ControllerEvent::AgentChosen {
                command,
                name: value,
            }),
            ArgumentKind::Inject => {}
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn clear_prompt(&self) {
        let mut pipeline = self.input.lock().await;
        self.store.update(|state| state.input.clear());
        self.refresh_prompt(&mut pipeline);
    }

    /// Re-derives mode and suggestions from the stored input.
    fn refresh_prompt(&self, pipeline: &mut InputPipeline) {
        let text = self.store.read(|state| state.input.text.clone());
        pipeline.interpreter.update_input(&text);
        self.publish_prompt(&pipeline.interpreter);
    }

    fn publish_prompt(&self, interpreter: &CommandInterpreter) {
        let mode = interpreter.mode().clone();
        let suggestions: Vec<Suggestion> = interpreter.suggestions().to_vec();
        let selected = interpreter.selected_index();
        self.store.update(|state| {
            state.input_mode = mode;
            state.suggestions = suggestions;
            state.selected_suggestion = selected;
        });
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;

//! Thread lifecycle and synchronization with the backend.
//!
//! `ThreadSynchronizer` owns every operation that changes which thread is
//! active or what the backend holds for it: agent initialization, thread
//! selection, creation, renaming, archiving, deletion and the post-send
//! reconciliation of optimistic messages.
//!
//! # Superseded work
//!
//! Two guards keep late results out of the store:
//! - Every agent selection bumps the store's agent epoch. Work started under
//!   an older epoch is discarded.
//! - Thread loads share a single slot holding a generation counter and a
//!   cancellation token. Starting a load cancels the previous one, and a
//!   result is applied only while holding the slot with a matching
//!   generation.

use crate::debounce::Debouncer;
use crate::reconcile::map_identifiers;
use crate::session::SessionStore;
use agentdeck_core::api::PlaygroundApi;
use agentdeck_core::config::PlaygroundConfig;
use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::{MessageId, ServerMessageId, ThreadId};
use agentdeck_core::message::Message;
use agentdeck_core::thread::{
    AgentRef, NewThread, Thread, ThreadDetail, ThreadUpdate, default_thread_title,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a thread load that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { message_count: usize },
    /// A newer selection replaced this one; nothing was applied.
    Superseded,
}

#[derive(Default)]
struct LoadSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl LoadSlot {
    /// Cancels the current load and invalidates its generation.
    fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    /// Cancels the current load and registers a new one.
    fn supersede(&mut self) -> (u64, CancellationToken) {
        self.cancel();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        (self.generation, token)
    }
}

pub struct ThreadSynchronizer {
    api: Arc<dyn PlaygroundApi>,
    store: SessionStore,
    title_pattern: String,
    load: Mutex<LoadSlot>,
    refresh: Debouncer,
}

impl ThreadSynchronizer {
    pub fn new(api: Arc<dyn PlaygroundApi>, store: SessionStore, config: &PlaygroundConfig) -> Self {
        Self {
            api,
            store,
            title_pattern: config.default_thread_title.clone(),
            load: Mutex::new(LoadSlot::default()),
            refresh: Debouncer::new(Duration::from_millis(config.refresh_debounce_ms)),
        }
    }

    pub fn default_title(&self, agent: &AgentRef) -> String {
        default_thread_title(&self.title_pattern, &agent.name)
    }

    /// Makes `agent` the selected agent and gives it an active thread.
    ///
    /// The previous agent's state is cleared before anything is awaited, so
    /// no message of the previous agent is ever shown under the new one.
    /// The most recent thread is reused when it is still empty; otherwise a
    /// new thread with the default title is created.
    ///
    /// # Returns
    ///
    /// - `Ok(Thread)`: The thread that became active
    /// - `Err(DeckError::Cancelled)`: Another agent was selected meanwhile
    /// - `Err(_)`: Listing or creating threads failed; the error banner is set
    pub async fn initialize_for_agent(&self, agent: AgentRef) -> Result<Thread> {
        let previous = self.store.selected_agent();
        let epoch = self.store.select_agent(agent.clone());
        debug!(
            "[ThreadSynchronizer] Selected agent {} ({}), epoch {}",
            agent.name, agent.id, epoch
        );
        self.load.lock().await.cancel();

        if let Some(previous) = previous.filter(|previous| previous.id != agent.id)
            && let Err(e) = self.api.exit_project_session(&previous.id).await
        {
            debug!(
                "[ThreadSynchronizer] No project session to exit for {}: {}",
                previous.id, e
            );
        }

        let threads = match self.api.list_threads(&agent.id).await {
            Ok(list) => list.threads,
            Err(e) => return Err(self.report(epoch, e, "Failed to load threads")),
        };
        self.ensure_epoch(epoch)?;

        let thread = self.adopt_or_create(&agent, epoch, threads.clone()).await?;
        self.ensure_epoch(epoch)?;

        let _slot = self.load.lock().await;
        self.store.update(|state| {
            state.threads = sorted(threads);
            state.upsert_thread(thread.clone());
            state.active_thread = Some(thread.clone());
            state.messages.clear();
            state.thread_load_error = None;
        });
        info!(
            "[ThreadSynchronizer] Agent {} ready on thread '{}'",
            agent.name, thread.title
        );
        Ok(thread)
    }

    /// Reuses the most recent empty thread or creates a new one.
    async fn adopt_or_create(
        &self,
        agent: &AgentRef,
        epoch: u64,
        threads: Vec<Thread>,
    ) -> Result<Thread> {
        let title = self.default_title(agent);
        let open: Vec<Thread> = threads.into_iter().filter(|t| !t.is_archived).collect();

        let reusable = Thread::most_recent(&open)
            .filter(|thread| thread.is_empty())
            .and_then(|thread| thread.id.clone().map(|id| (id, thread.clone())));

        let Some((thread_id, thread)) = reusable else {
            debug!("[ThreadSynchronizer] Creating default thread '{}'", title);
            let request = NewThread {
                agent_id: agent.id.clone(),
                title,
            };
            return self
                .api
                .create_thread(&request)
                .await
                .map_err(|e| self.report(epoch, e, "Failed to create thread"));
        };

        if thread.title == title {
            debug!("[ThreadSynchronizer] Reusing empty thread {}", thread_id);
            return Ok(thread);
        }

        debug!(
            "[ThreadSynchronizer] Reusing empty thread {} as '{}' (was '{}')",
            thread_id, title, thread.title
        );
        match self
            .api
            .update_thread(&thread_id, &ThreadUpdate::title(title.clone()))
            .await
        {
            Ok(renamed) => Ok(with_id(renamed, &thread_id)),
            Err(e) => {
                warn!(
                    "[ThreadSynchronizer] Failed to rename reused thread {}: {}",
                    thread_id, e
                );
                Ok(thread)
            }
        }
    }

    /// Makes `thread_id` active and loads its messages.
    ///
    /// The thread becomes active and the previous messages disappear at
    /// once. A load that is overtaken by a newer selection, or by an agent
    /// switch, returns `LoadOutcome::Superseded` without touching the store.
    /// A response without a well-formed message list, or with an error code,
    /// sets `thread_load_error` instead of rendering an empty thread.
    pub async fn select_thread(&self, thread_id: ThreadId) -> Result<LoadOutcome> {
        let epoch = self.store.read(|state| state.agent_epoch);
        let (generation, token) = {
            let mut slot = self.load.lock().await;
            let ticket = slot.supersede();
            self.store.update(|state| {
                let thread = state
                    .threads
                    .iter()
                    .find(|t| t.id.as_ref() == Some(&thread_id))
                    .cloned()
                    .unwrap_or_else(|| placeholder(&thread_id));
                state.active_thread = Some(thread);
                state.messages.clear();
                state.streaming_message = None;
                state.thread_load_error = None;
                state.is_loading_thread = true;
            });
            ticket
        };
        debug!(
            "[ThreadSynchronizer] Loading thread {} (generation {})",
            thread_id, generation
        );

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(DeckError::Cancelled),
            result = self.api.get_thread(&thread_id, token.clone()) => result,
        };

        let mut slot = self.load.lock().await;
        if slot.generation != generation || !self.store.is_current_epoch(epoch) {
            debug!(
                "[ThreadSynchronizer] Discarding superseded load of thread {}",
                thread_id
            );
            return Ok(LoadOutcome::Superseded);
        }
        slot.token = None;
        self.apply_load(&thread_id, result)
    }

    fn apply_load(&self, thread_id: &ThreadId, result: Result<ThreadDetail>) -> Result<LoadOutcome> {
        let (thread, messages) = match result.and_then(validate_detail) {
            Ok(loaded) => loaded,
            Err(e) if e.is_cancelled() => {
                self.store.update(|state| state.is_loading_thread = false);
                return Ok(LoadOutcome::Superseded);
            }
            Err(e) => {
                warn!(
                    "[ThreadSynchronizer] Failed to load thread {}: {}",
                    thread_id, e
                );
                let load_failure = e.is_thread_load_failure();
                let text = e.user_message();
                self.store.update(|state| {
                    state.is_loading_thread = false;
                    state.messages.clear();
                    if load_failure {
                        state.thread_load_error = Some(text);
                    } else {
                        state.error = Some(format!("Failed to load thread: {text}"));
                    }
                });
                return Err(e);
            }
        };

        let message_count = messages.len();
        let thread = with_id(thread, thread_id);
        self.store.update(|state| {
            state.messages = messages;
            state.upsert_thread(thread.clone());
            state.active_thread = Some(thread);
            state.sync_message_count();
            state.is_loading_thread = false;
        });
        debug!(
            "[ThreadSynchronizer] Loaded thread {} with {} messages",
            thread_id, message_count
        );
        Ok(LoadOutcome::Loaded { message_count })
    }

    /// Creates a thread for the selected agent and makes it active.
    ///
    /// A blank or missing title falls back to the default title.
    pub async fn create_thread(&self, title: Option<String>) -> Result<Thread> {
        let agent = self
            .store
            .selected_agent()
            .ok_or_else(|| DeckError::invalid_state("No agent selected"))?;
        let epoch = self.store.read(|state| state.agent_epoch);
        let title = title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| self.default_title(&agent));

        let request = NewThread {
            agent_id: agent.id.clone(),
            title,
        };
        let thread = self
            .api
            .create_thread(&request)
            .await
            .map_err(|e| self.report(epoch, e, "Failed to create thread"))?;
        self.ensure_epoch(epoch)?;

        let mut slot = self.load.lock().await;
        slot.cancel();
        self.store.update(|state| {
            state.upsert_thread(thread.clone());
            state.active_thread = Some(thread.clone());
            state.messages.clear();
            state.streaming_message = None;
            state.thread_load_error = None;
            state.is_loading_thread = false;
        });
        info!(
            "[ThreadSynchronizer] Created thread '{}' for {}",
            thread.title, agent.name
        );
        Ok(thread)
    }

    /// Re-fetches a thread after a send and adopts the server's list.
    ///
    /// Optimistic messages are paired with their confirmed counterparts in
    /// the id map before the list is replaced. Failures are logged and left
    /// to the caller; the local list stays as it was.
    pub async fn reconcile_after_send(&self, thread_id: &ThreadId) -> Result<()> {
        let loaded = self
            .api
            .get_thread(thread_id, CancellationToken::new())
            .await
            .and_then(validate_detail);
        let (thread, server_messages) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    "[ThreadSynchronizer] Reconciliation of thread {} failed: {}",
                    thread_id, e
                );
                return Err(e);
            }
        };

        let thread = with_id(thread, thread_id);
        let _slot = self.load.lock().await;
        self.store.update(|state| {
            if !state.is_active_thread(thread_id) || state.is_loading_thread {
                return;
            }
            let mapped = map_identifiers(&state.messages, &server_messages);
            debug!(
                "[ThreadSynchronizer] Reconciled thread {}: {} local, {} server, {} mapped",
                thread_id,
                state.messages.len(),
                server_messages.len(),
                mapped.len()
            );
            state.id_map.extend(mapped);
            if state.messages != server_messages {
                state.messages = server_messages;
            }
            state.upsert_thread(thread);
            state.sync_message_count();
        });
        Ok(())
    }

    /// Renames a thread on the backend and locally.
    pub async fn rename_thread(&self, thread_id: &ThreadId, title: &str) -> Result<Thread> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DeckError::invalid_state("Thread title cannot be empty"));
        }
        let epoch = self.store.read(|state| state.agent_epoch);
        let thread = self
            .api
            .update_thread(thread_id, &ThreadUpdate::title(title))
            .await
            .map_err(|e| self.report(epoch, e, "Failed to rename thread"))?;
        let thread = with_id(thread, thread_id);
        self.store.update(|state| state.upsert_thread(thread.clone()));
        Ok(thread)
    }

    /// Applies a rename the backend already performed.
    pub fn apply_rename(&self, thread_id: &ThreadId, title: &str) {
        debug!(
            "[ThreadSynchronizer] Thread {} renamed to '{}'",
            thread_id, title
        );
        self.store.update(|state| {
            let matches = |thread: &Thread| thread.id.as_ref() == Some(thread_id);
            if let Some(active) = state.active_thread.as_mut().filter(|t| matches(t)) {
                active.title = title.to_string();
            }
            if let Some(listed) = state.threads.iter_mut().find(|t| matches(t)) {
                listed.title = title.to_string();
            }
        });
    }

    /// Re-lists the selected agent's threads.
    pub async fn refresh_threads(&self) -> Result<()> {
        let Some(agent) = self.store.selected_agent() else {
            return Ok(());
        };
        let epoch = self.store.read(|state| state.agent_epoch);
        let threads = self.api.list_threads(&agent.id).await?.threads;
        self.ensure_epoch(epoch)?;

        let threads = sorted(threads);
        self.store.update(|state| {
            if let Some(active) = state.active_thread.as_mut()
                && let Some(fresh) = threads
                    .iter()
                    .find(|t| t.id.is_some() && t.id == active.id)
            {
                active.title = fresh.title.clone();
                active.updated_at = fresh.updated_at.clone();
                active.is_archived = fresh.is_archived;
            }
            state.threads = threads;
        });
        debug!("[ThreadSynchronizer] Refreshed threads of {}", agent.name);
        Ok(())
    }

    /// Schedules a debounced `refresh_threads`.
    pub fn schedule_refresh(self: &Arc<Self>) {
        let synchronizer = Arc::clone(self);
        self.refresh.schedule(async move {
            if let Err(e) = synchronizer.refresh_threads().await {
                debug!("[ThreadSynchronizer] Thread refresh skipped: {}", e);
            }
        });
    }

    pub async fn archive_thread(&self, thread_id: &ThreadId, archived: bool) -> Result<Thread> {
        let epoch = self.store.read(|state| state.agent_epoch);
        let thread = self
            .api
            .update_thread(thread_id, &ThreadUpdate::archived(archived))
            .await
            .map_err(|e| self.report(epoch, e, "Failed to archive thread"))?;
        let thread = with_id(thread, thread_id);
        self.store.update(|state| state.upsert_thread(thread.clone()));
        Ok(thread)
    }

    /// Deletes a thread. Deleting the active thread activates another one.
    pub async fn delete_thread(&self, thread_id: &ThreadId) -> Result<()> {
        let epoch = self.store.read(|state| state.agent_epoch);
        self.api
            .delete_thread(thread_id)
            .await
            .map_err(|e| self.report(epoch, e, "Failed to delete thread"))?;

        let mut was_active = false;
        self.store.update(|state| {
            state.threads.retain(|t| t.id.as_ref() != Some(thread_id));
            if state.is_active_thread(thread_id) {
                was_active = true;
                state.active_thread = None;
                state.messages.clear();
                state.streaming_message = None;
            }
        });
        info!("[ThreadSynchronizer] Deleted thread {}", thread_id);

        if was_active {
            self.ensure_active_thread().await?;
        }
        Ok(())
    }

    /// Activates the most recent remaining thread, or creates one.
    async fn ensure_active_thread(&self) -> Result<()> {
        let next = self.store.read(|state| {
            let open: Vec<Thread> = state
                .threads
                .iter()
                .filter(|t| !t.is_archived)
                .cloned()
                .collect();
            Thread::most_recent(&open).and_then(|t| t.id.clone())
        });
        match next {
            Some(thread_id) => self.select_thread(thread_id).await.map(|_| ()),
            None => self.create_thread(None).await.map(|_| ()),
        }
    }

    /// Deletes a message and every later message of the active thread.
    pub async fn delete_message(&self, message_id: &MessageId) -> Result<()> {
        let (thread_id, server_id) = self.confirmed_target(message_id)?;
        let epoch = self.store.read(|state| state.agent_epoch);
        self.api
            .delete_message(&thread_id, &server_id)
            .await
            .map_err(|e| self.report(epoch, e, "Failed to delete message"))?;

        self.store.update(|state| {
            if !state.is_active_thread(&thread_id) {
                return;
            }
            if let Some(position) = state.position_of(message_id) {
                state.messages.truncate(position);
                state.sync_message_count();
            }
        });
        Ok(())
    }

    pub async fn set_bookmark(&self, message_id: &MessageId, bookmarked: bool) -> Result<()> {
        let (thread_id, server_id) = self.confirmed_target(message_id)?;
        let epoch = self.store.read(|state| state.agent_epoch);
        self.api
            .set_bookmark(&thread_id, &server_id, bookmarked)
            .await
            .map_err(|e| self.report(epoch, e, "Failed to update bookmark"))?;

        self.store.update(|state| {
            if !state.is_active_thread(&thread_id) {
                return;
            }
            if let Some(position) = state.position_of(message_id) {
                state.messages[position].is_bookmarked = bookmarked;
            }
        });
        Ok(())
    }

    /// Active thread and server identity for a message operation.
    fn confirmed_target(
        &self,
        message_id: &MessageId,
    ) -> Result<(ThreadId, ServerMessageId)> {
        self.store.read(|state| {
            let thread_id = state
                .active_thread_id()
                .cloned()
                .ok_or_else(|| DeckError::invalid_state("No active thread"))?;
            let server_id = state
                .resolve_server_id(message_id)
                .ok_or_else(|| {
                    DeckError::invalid_state("Message has not been confirmed by the server yet")
                })?;
            Ok((thread_id, server_id))
        })
    }

    fn ensure_epoch(&self, epoch: u64) -> Result<()> {
        if self.store.is_current_epoch(epoch) {
            Ok(())
        } else {
            debug!("[ThreadSynchronizer] Discarding result for a previous agent");
            Err(DeckError::Cancelled)
        }
    }

    /// Logs a failure and shows it when it still concerns the current agent.
    fn report(&self, epoch: u64, error: DeckError, context: &str) -> DeckError {
        warn!("[ThreadSynchronizer] {}: {}", context, error);
        if self.store.is_current_epoch(epoch) {
            let text = format!("{context}: {}", error.user_message());
            self.store.set_error(Some(text));
        }
        error
    }
}

/// Splits a thread response into metadata and messages.
fn validate_detail(detail: ThreadDetail) -> Result<(Thread, Vec<Message>)> {
    if detail.error_code.is_some() || detail.error_message.is_some() {
        let message = detail
            .error_message
            .unwrap_or_else(|| "The thread could not be loaded".to_string());
        return Err(DeckError::backend(detail.error_code, message));
    }
    let messages = detail
        .messages
        .ok_or_else(|| DeckError::malformed("Thread response has no message list"))?;
    Ok((detail.thread, messages.into_iter().map(Message::from).collect()))
}

fn with_id(mut thread: Thread, thread_id: &ThreadId) -> Thread {
    thread.id.get_or_insert_with(|| thread_id.clone());
    thread
}

fn placeholder(thread_id: &ThreadId) -> Thread {
    Thread {
        id: Some(thread_id.clone()),
        agent_id: None,
        title: String::new(),
        message_count: 0,
        updated_at: String::new(),
        is_archived: false,
        recipient: None,
    }
}

fn sorted(mut threads: Vec<Thread>) -> Vec<Thread> {
    threads.sort_by(Thread::newest_first);
    threads
}

#[cfg(test)]
#[path = "thread_sync_test.rs"]
mod tests;

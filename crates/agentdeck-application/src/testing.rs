//! Scripted backend doubles shared by the unit tests.

use agentdeck_core::api::PlaygroundApi;
use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::{AgentId, ServerMessageId, ThreadId};
use agentdeck_core::message::{MessageRole, WireMessage};
use agentdeck_core::response::SendMessageResponse;
use agentdeck_core::slash_command::{SlashCommand, SlashCommandRequest, SlashCommandResponse};
use agentdeck_core::streaming::{StreamEvent, StreamingChannel};
use agentdeck_core::thread::{NewThread, Thread, ThreadDetail, ThreadList, ThreadUpdate};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;

pub fn thread(id: &str, agent: &str, title: &str, message_count: u32, updated_at: &str) -> Thread {
    Thread {
        id: Some(ThreadId::from(id)),
        agent_id: Some(AgentId::from(agent)),
        title: title.to_string(),
        message_count,
        updated_at: updated_at.to_string(),
        is_archived: false,
        recipient: None,
    }
}

pub fn wire(id: &str, role: MessageRole, content: &str) -> WireMessage {
    WireMessage {
        message_id: ServerMessageId::from(id),
        role,
        content: content.to_string(),
        timestamp: "2025-01-01T00:00:00Z".to_string(),
        audio_url: None,
        is_edited: false,
        is_bookmarked: false,
    }
}

/// In-memory backend.
///
/// Threads and messages live in maps; calls are recorded as
/// `"operation:arg"` strings. `get_thread` for a gated thread blocks until
/// the gate is released.
#[derive(Default)]
pub struct MockApi {
    threads: Mutex<Vec<Thread>>,
    messages: Mutex<HashMap<ThreadId, Vec<WireMessage>>>,
    detail_overrides: Mutex<HashMap<ThreadId, ThreadDetail>>,
    gates: Mutex<HashMap<ThreadId, Arc<Notify>>>,
    send_replies: Mutex<VecDeque<Result<SendMessageResponse>>>,
    command_replies: Mutex<VecDeque<Result<SlashCommandResponse>>>,
    commands: Mutex<Vec<SlashCommand>>,
    failing: Mutex<Vec<&'static str>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_thread(&self, thread: Thread) {
        self.threads.lock().unwrap().push(thread);
    }

    /// Renames a thread as the backend would on its own.
    pub fn set_title(&self, thread_id: &str, title: &str) {
        let thread_id = ThreadId::from(thread_id);
        if let Some(thread) = self
            .threads
            .lock()
            .unwrap()
            .iter_mut()
            .find(|t| t.id.as_ref() == Some(&thread_id))
        {
            thread.title = title.to_string();
        }
    }

    pub fn set_messages(&self, thread_id: &str, messages: Vec<WireMessage>) {
        self.messages
            .lock()
            .unwrap()
            .insert(ThreadId::from(thread_id), messages);
    }

    pub fn override_detail(&self, thread_id: &str, detail: ThreadDetail) {
        self.detail_overrides
            .lock()
            .unwrap()
            .insert(ThreadId::from(thread_id), detail);
    }

    /// Holds `get_thread` for this thread until `release`.
    pub fn gate(&self, thread_id: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(ThreadId::from(thread_id), Arc::new(Notify::new()));
    }

    pub fn release(&self, thread_id: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(&ThreadId::from(thread_id)) {
            gate.notify_one();
        }
    }

    pub fn queue_send(&self, reply: Result<SendMessageResponse>) {
        self.send_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_command(&self, reply: Result<SlashCommandResponse>) {
        self.command_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_commands(&self, commands: Vec<SlashCommand>) {
        *self.commands.lock().unwrap() = commands;
    }

    /// Makes every call of `operation` fail with a transport error.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().push(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(operation))
            .count()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    fn record(&self, operation: &'static str, arg: impl std::fmt::Display) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{operation}:{arg}"));
        if self.failing.lock().unwrap().contains(&operation) {
            return Err(DeckError::transport(format!("{operation} unavailable")));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn find_thread(&self, thread_id: &ThreadId) -> Result<Thread> {
        self.threads
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id.as_ref() == Some(thread_id))
            .cloned()
            .ok_or_else(|| DeckError::not_found("thread", thread_id.as_str()))
    }
}

#[async_trait]
impl PlaygroundApi for MockApi {
    async fn list_threads(&self, agent_id: &AgentId) -> Result<ThreadList> {
        self.record("list_threads", agent_id)?;
        let threads = self
            .threads
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.agent_id.as_ref() == Some(agent_id))
            .cloned()
            .collect();
        Ok(ThreadList { threads })
    }

    async fn create_thread(&self, request: &NewThread) -> Result<Thread> {
        self.record("create_thread", &request.title)?;
        let id = self.next_id("t");
        let created = Thread {
            id: Some(ThreadId::from(id.as_str())),
            agent_id: Some(request.agent_id.clone()),
            title: request.title.clone(),
            message_count: 0,
            updated_at: "2030-01-01T00:00:00Z".to_string(),
            is_archived: false,
            recipient: None,
        };
        self.threads.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn get_thread(
        &self,
        thread_id: &ThreadId,
        _cancel: CancellationToken,
    ) -> Result<ThreadDetail> {
        self.record("get_thread", thread_id)?;
        let gate = self.gates.lock().unwrap().get(thread_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(detail) = self.detail_overrides.lock().unwrap().get(thread_id) {
            return Ok(detail.clone());
        }
        let thread = self.find_thread(thread_id)?;
        let messages = self
            .messages
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .unwrap_or_default();
        Ok(ThreadDetail {
            thread,
            messages: Some(messages),
            error_code: None,
            error_message: None,
        })
    }

    async fn update_thread(&self, thread_id: &ThreadId, update: &ThreadUpdate) -> Result<Thread> {
        self.record(
            "update_thread",
            format!("{}={}", thread_id, update.title.clone().unwrap_or_default()),
        )?;
        let mut threads = self.threads.lock().unwrap();
        let thread = threads
            .iter_mut()
            .find(|t| t.id.as_ref() == Some(thread_id))
            .ok_or_else(|| DeckError::not_found("thread", thread_id.as_str()))?;
        if let Some(title) = update.title.clone() {
            thread.title = title;
        }
        if let Some(archived) = update.is_archived {
            thread.is_archived = archived;
        }
        Ok(thread.clone())
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> Result<()> {
        self.record("delete_thread", thread_id)?;
        self.threads
            .lock()
            .unwrap()
            .retain(|t| t.id.as_ref() != Some(thread_id));
        Ok(())
    }

    async fn send_message(
        &self,
        agent_id: &AgentId,
        text: &str,
        thread_id: Option<&ThreadId>,
    ) -> Result<SendMessageResponse> {
        self.record("send_message", text)?;
        let _ = agent_id;
        if let Some(reply) = self.send_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let user = wire(&self.next_id("m"), MessageRole::User, text);
        let reply = wire(
            &self.next_id("m"),
            MessageRole::Assistant,
            &format!("echo: {text}"),
        );
        if let Some(thread_id) = thread_id {
            let mut messages = self.messages.lock().unwrap();
            let thread_messages = messages.entry(thread_id.clone()).or_default();
            thread_messages.push(user);
            thread_messages.push(reply.clone());
        }
        Ok(SendMessageResponse {
            status: "success".to_string(),
            message: Some(reply),
            ..Default::default()
        })
    }

    async fn execute_slash_command(
        &self,
        request: &SlashCommandRequest,
    ) -> Result<SlashCommandResponse> {
        self.record("execute_slash_command", &request.message)?;
        self.command_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(SlashCommandResponse {
                    message: Some(format!("ran {}", request.message)),
                    ..Default::default()
                })
            })
    }

    async fn list_slash_commands(&self) -> Result<Vec<SlashCommand>> {
        self.record("list_slash_commands", "")?;
        Ok(self.commands.lock().unwrap().clone())
    }

    async fn exit_project_session(&self, agent_id: &AgentId) -> Result<()> {
        self.record("exit_project_session", agent_id)?;
        Err(DeckError::not_found("project session", agent_id.as_str()))
    }

    async fn delete_message(
        &self,
        thread_id: &ThreadId,
        message_id: &ServerMessageId,
    ) -> Result<()> {
        self.record("delete_message", message_id)?;
        let mut messages = self.messages.lock().unwrap();
        if let Some(thread_messages) = messages.get_mut(thread_id)
            && let Some(position) = thread_messages
                .iter()
                .position(|m| &m.message_id == message_id)
        {
            thread_messages.truncate(position);
        }
        Ok(())
    }

    async fn set_bookmark(
        &self,
        _thread_id: &ThreadId,
        message_id: &ServerMessageId,
        bookmarked: bool,
    ) -> Result<()> {
        self.record("set_bookmark", format!("{message_id}={bookmarked}"))
    }
}

/// Streaming channel that replays a script when a send is accepted.
pub struct MockChannel {
    connected: AtomicBool,
    accepting: AtomicBool,
    events: broadcast::Sender<StreamEvent>,
    script: Mutex<Vec<StreamEvent>>,
    sent: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new(connected: bool) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            accepting: AtomicBool::new(true),
            events,
            script: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, events: Vec<StreamEvent>) {
        *self.script.lock().unwrap() = events;
    }

    /// Publishes an event outside of any scripted send.
    pub fn emit(&self, event: StreamEvent) {
        let _ = self.events.send(event);
    }

    pub fn decline(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl StreamingChannel for MockChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&self, _agent_id: &AgentId, text: &str, _thread_id: Option<&ThreadId>) -> bool {
        if !self.accepting.load(Ordering::SeqCst) {
            return false;
        }
        self.sent.lock().unwrap().push(text.to_string());
        for event in self.script.lock().unwrap().drain(..) {
            let _ = self.events.send(event);
        }
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }
}

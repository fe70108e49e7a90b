//! WebSocket implementation of the streaming channel.
//!
//! One connection carries every reply. Outgoing sends are queued to a writer
//! task; a reader task turns server frames into `StreamEvent`s on a
//! broadcast channel. The server speaks JSON text frames tagged by `type`:
//!
//! ```text
//! -> {"type":"message","agent_id":"a1","message":"hi","thread_id":"7"}
//! <- {"type":"partial","thread_id":"7","content":"Hel"}
//! <- {"type":"complete","thread_id":"7","message":{...},"thread_renamed":true,...}
//! <- {"type":"error","thread_id":"7","message":"agent unavailable"}
//! ```

use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::{AgentId, ThreadId};
use agentdeck_core::message::WireMessage;
use agentdeck_core::response::ResponseMetadata;
use agentdeck_core::streaming::{ConnectionState, StreamEvent, StreamingChannel};
use futures::{SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame<'a> {
    Message {
        agent_id: &'a AgentId,
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<&'a ThreadId>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    Partial {
        #[serde(default)]
        thread_id: Option<ThreadId>,
        #[serde(default)]
        content: String,
    },
    Complete {
        #[serde(default)]
        thread_id: Option<ThreadId>,
        #[serde(default)]
        message: Option<CompletedMessage>,
        #[serde(default)]
        thread_renamed: bool,
        #[serde(default)]
        new_thread_title: Option<String>,
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        data: Option<Value>,
    },
    Error {
        #[serde(default)]
        thread_id: Option<ThreadId>,
        #[serde(default, alias = "error")]
        message: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Completion frames carry either the stored message or just its text.
#[derive(Deserialize)]
#[serde(untagged)]
enum CompletedMessage {
    Stored(WireMessage),
    Text(String),
}

/// Maps one server text frame to an event.
///
/// Returns `Ok(None)` for frame types this client does not consume.
pub fn parse_frame(text: &str) -> Result<Option<StreamEvent>> {
    let frame: ServerFrame = serde_json::from_str(text).map_err(|e| DeckError::Serialization {
        format: "json".to_string(),
        message: e.to_string(),
    })?;

    Ok(match frame {
        ServerFrame::Partial { thread_id, content } => {
            Some(StreamEvent::Partial { thread_id, content })
        }
        ServerFrame::Complete {
            thread_id,
            message,
            thread_renamed,
            new_thread_title,
            action,
            data,
        } => Some(StreamEvent::Complete {
            thread_id,
            // A bare text completion adds nothing to the accumulated fragments.
            message: match message {
                Some(CompletedMessage::Stored(wire)) => Some(wire),
                Some(CompletedMessage::Text(_)) | None => None,
            },
            metadata: ResponseMetadata {
                thread_renamed,
                new_thread_title,
                action,
                data,
            },
        }),
        ServerFrame::Error { thread_id, message } => Some(StreamEvent::Error {
            thread_id,
            message: message.unwrap_or_else(|| "The agent returned an error".to_string()),
        }),
        ServerFrame::Other => None,
    })
}

/// `StreamingChannel` over a single WebSocket connection.
pub struct WebSocketChannel {
    connected: Arc<AtomicBool>,
    events: broadcast::Sender<StreamEvent>,
    outgoing: mpsc::UnboundedSender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WebSocketChannel {
    /// Connects to `url` and starts the reader and writer tasks.
    pub async fn connect(url: &str) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        debug!("[WebSocketChannel] Connecting to {}", url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| {
                DeckError::transport(format!("WebSocket connect to {} failed: {}", url, e))
            })?;
        info!("[WebSocketChannel] Connected to {}", url);

        let (mut sink, stream) = ws_stream.split();
        let connected = Arc::new(AtomicBool::new(true));
        let (outgoing, mut queue) = mpsc::unbounded_channel::<String>();

        let writer_connected = Arc::clone(&connected);
        let writer = tokio::spawn(async move {
            while let Some(text) = queue.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                    warn!("[WebSocketChannel] Send failed: {}", e);
                    writer_connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
            let _ = sink.send(WsMessage::Close(None)).await;
        });

        let reader = tokio::spawn(read_frames(stream, events.clone(), Arc::clone(&connected)));

        Ok(Self {
            connected,
            events,
            outgoing,
            reader,
            writer,
        })
    }
}

async fn read_frames<S>(
    mut stream: S,
    events: broadcast::Sender<StreamEvent>,
    connected: Arc<AtomicBool>,
) where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    let _ = events.send(StreamEvent::Connection(ConnectionState::Connected));

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match parse_frame(&text) {
                Ok(Some(event)) => {
                    // No subscribers simply means nobody is waiting on a reply.
                    let _ = events.send(event);
                }
                Ok(None) => {}
                Err(e) => debug!("[WebSocketChannel] Ignoring frame: {}", e),
            },
            Ok(WsMessage::Close(_)) => {
                info!("[WebSocketChannel] Server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("[WebSocketChannel] Read failed: {}", e);
                break;
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    let _ = events.send(StreamEvent::Connection(ConnectionState::Disconnected));
}

impl StreamingChannel for WebSocketChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn send(&self, agent_id: &AgentId, text: &str, thread_id: Option<&ThreadId>) -> bool {
        if !self.is_connected() {
            return false;
        }
        let frame = ClientFrame::Message {
            agent_id,
            message: text,
            thread_id,
        };
        match serde_json::to_string(&frame) {
            Ok(json) => self.outgoing.send(json).is_ok(),
            Err(e) => {
                warn!("[WebSocketChannel] Failed to encode frame: {}", e);
                false
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

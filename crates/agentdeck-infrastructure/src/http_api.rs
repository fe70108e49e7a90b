//! HTTP implementation of the playground API.
//!
//! Every backend call is a JSON request against `api.base_url`. Failures are
//! mapped onto the shared error taxonomy:
//!
//! - connection, timeout and body read failures become `DeckError::Transport`
//! - non-2xx statuses become `DeckError::Backend`, carrying the body's error
//!   text and code when it has them
//! - bodies that do not decode become `DeckError::MalformedResponse`

use agentdeck_core::api::PlaygroundApi;
use agentdeck_core::config::ApiConfig;
use agentdeck_core::error::{DeckError, Result};
use agentdeck_core::ids::{AgentId, ServerMessageId, ThreadId};
use agentdeck_core::response::{SendMessageRequest, SendMessageResponse};
use agentdeck_core::slash_command::{SlashCommand, SlashCommandRequest, SlashCommandResponse};
use agentdeck_core::thread::{NewThread, Thread, ThreadDetail, ThreadList, ThreadUpdate};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// `PlaygroundApi` over reqwest.
#[derive(Debug, Clone)]
pub struct HttpPlaygroundApi {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

/// Thread listings come either bare or wrapped in `{"threads": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ThreadListing {
    Bare(Vec<Thread>),
    Wrapped(ThreadList),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommandListing {
    Bare(Vec<SlashCommand>),
    Wrapped { commands: Vec<SlashCommand> },
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "error_code")]
    code: Option<String>,
}

impl HttpPlaygroundApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            DeckError::config(format!("Invalid API base URL '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DeckError::config(format!(
                "API base URL '{}' cannot carry paths",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeckError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
        })
    }

    /// Joins percent-encoded `segments` onto the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!("[HttpPlaygroundApi] {} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Sends the request and returns the status with the raw body.
    async fn dispatch(&self, builder: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        Ok((status, body))
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let (status, body) = self.dispatch(builder).await?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }
        decode(&body)
    }

    async fn execute_empty(&self, builder: RequestBuilder) -> Result<()> {
        let (status, body) = self.dispatch(builder).await?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> DeckError {
    if err.is_timeout() {
        DeckError::transport(format!("Request timed out: {}", err))
    } else {
        DeckError::transport(err.to_string())
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| DeckError::malformed(format!("{}", e)))
}

fn error_from_body(status: StatusCode, body: &str) -> DeckError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = [parsed.error, parsed.detail, parsed.message]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
        .unwrap_or_else(|| {
            let text = body.trim();
            if text.is_empty() {
                status.to_string()
            } else {
                text.to_string()
            }
        });
    let code = parsed.code.or_else(|| Some(status.as_u16().to_string()));
    DeckError::backend(code, message)
}

#[async_trait]
impl PlaygroundApi for HttpPlaygroundApi {
    async fn list_threads(&self, agent_id: &AgentId) -> Result<ThreadList> {
        let listing: ThreadListing = self
            .execute(self.request(Method::GET, &["agents", agent_id.as_str(), "threads"]))
            .await?;
        Ok(match listing {
            ThreadListing::Bare(threads) => ThreadList { threads },
            ThreadListing::Wrapped(list) => list,
        })
    }

    async fn create_thread(&self, request: &NewThread) -> Result<Thread> {
        self.execute(self.request(Method::POST, &["threads"]).json(request))
            .await
    }

    async fn get_thread(
        &self,
        thread_id: &ThreadId,
        cancel: CancellationToken,
    ) -> Result<ThreadDetail> {
        let request = self.execute(self.request(Method::GET, &["threads", thread_id.as_str()]));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[HttpPlaygroundApi] Load of thread {} cancelled", thread_id);
                Err(DeckError::Cancelled)
            }
            result = request => result,
        }
    }

    async fn update_thread(&self, thread_id: &ThreadId, update: &ThreadUpdate) -> Result<Thread> {
        self.execute(
            self.request(Method::PATCH, &["threads", thread_id.as_str()])
                .json(update),
        )
        .await
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> Result<()> {
        self.execute_empty(self.request(Method::DELETE, &["threads", thread_id.as_str()]))
            .await
    }

    async fn send_message(
        &self,
        agent_id: &AgentId,
        text: &str,
        thread_id: Option<&ThreadId>,
    ) -> Result<SendMessageResponse> {
        let payload = SendMessageRequest {
            message: text.to_string(),
            thread_id: thread_id.cloned(),
        };
        self.execute(
            self.request(Method::POST, &["agents", agent_id.as_str(), "messages"])
                .json(&payload),
        )
        .await
    }

    async fn execute_slash_command(
        &self,
        request: &SlashCommandRequest,
    ) -> Result<SlashCommandResponse> {
        self.execute(
            self.request(Method::POST, &["slash-commands", "execute"])
                .json(request),
        )
        .await
    }

    async fn list_slash_commands(&self) -> Result<Vec<SlashCommand>> {
        let listing: CommandListing = self
            .execute(self.request(Method::GET, &["slash-commands"]))
            .await?;
        Ok(match listing {
            CommandListing::Bare(commands) | CommandListing::Wrapped { commands } => commands,
        })
    }

    async fn exit_project_session(&self, agent_id: &AgentId) -> Result<()> {
        let builder = self.request(Method::POST, &["agents", agent_id.as_str(), "project", "exit"]);
        let (status, body) = self.dispatch(builder).await?;
        if status == StatusCode::NOT_FOUND {
            debug!("[HttpPlaygroundApi] No project session for {}", agent_id);
            return Ok(());
        }
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }
        Ok(())
    }

    async fn delete_message(
        &self,
        thread_id: &ThreadId,
        message_id: &ServerMessageId,
    ) -> Result<()> {
        self.execute_empty(self.request(
            Method::DELETE,
            &["threads", thread_id.as_str(), "messages", message_id.as_str()],
        ))
        .await
    }

    async fn set_bookmark(
        &self,
        thread_id: &ThreadId,
        message_id: &ServerMessageId,
        bookmarked: bool,
    ) -> Result<()> {
        self.execute_empty(
            self.request(
                Method::PATCH,
                &["threads", thread_id.as_str(), "messages", message_id.as_str()],
            )
            .json(&json!({ "is_bookmarked": bookmarked })),
        )
        .await
    }
}

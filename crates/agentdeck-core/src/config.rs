use crate::thread::DEFAULT_THREAD_TITLE_PATTERN;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct DeckConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub playground: PlaygroundConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StreamingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// WebSocket endpoint; streaming stays off without one
    #[serde(default)]
    pub url: Option<String>,
}

impl StreamingConfig {
    pub fn endpoint(&self) -> Option<&str> {
        if self.enabled {
            self.url.as_deref().filter(|url| !url.is_empty())
        } else {
            None
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PlaygroundConfig {
    /// Channel name reported with slash commands
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,
    /// `{agent}` is replaced by the agent name
    #[serde(default = "default_thread_title")]
    pub default_thread_title: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            suggestion_limit: default_suggestion_limit(),
            refresh_debounce_ms: default_refresh_debounce_ms(),
            default_thread_title: default_thread_title(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_channel() -> String {
    "playground".to_string()
}

fn default_suggestion_limit() -> usize {
    8
}

fn default_refresh_debounce_ms() -> u64 {
    100
}

fn default_thread_title() -> String {
    DEFAULT_THREAD_TITLE_PATTERN.to_string()
}

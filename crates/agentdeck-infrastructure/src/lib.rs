//! Infrastructure adapters for agentdeck: the HTTP API client, the
//! WebSocket streaming channel and file-based configuration.

pub mod config_service;
pub mod http_api;
pub mod paths;
pub mod ws_channel;

pub use crate::config_service::ConfigService;
pub use crate::http_api::HttpPlaygroundApi;
pub use crate::paths::DeckPaths;
pub use crate::ws_channel::WebSocketChannel;

//! Chat client configuration
//!
//! The explicit configuration passed into [`super::ChatClient`] at construction.

use crate::ai::types::Protocol;
use crate::config::ChatConfig;
use crate::constants;

/// Configuration for the chat client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway URL to POST to
    pub endpoint: String,
    /// Protocol of the streamed response body
    pub protocol: Protocol,
    /// Most recent history messages sent per request
    pub max_history_messages: usize,
    /// Signature secret
    pub secret_key: String,
    /// Optional outbound proxy
    pub proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::http::DEFAULT_ENDPOINT.to_string(),
            protocol: Protocol::default(),
            max_history_messages: constants::chat::MAX_HISTORY_MESSAGES,
            secret_key: String::new(),
            proxy: None,
        }
    }
}

impl From<&ChatConfig> for ClientConfig {
    fn from(config: &ChatConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            protocol: config.protocol,
            max_history_messages: config.max_history_messages,
            secret_key: config.secret_key.clone(),
            proxy: config.outbound_proxy().map(str::to_string),
        }
    }
}

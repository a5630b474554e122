//! Core chat client
//!
//! Owns the HTTP client, configuration and signer.

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{error, info};

use super::config::ClientConfig;
use super::request_builder::RequestBuilder;
use crate::auth::Signer;
use crate::constants;
use crate::error::{ChatError, ErrorMessage};

/// Build the HTTP client used for streaming calls
///
/// Only the connect phase is bounded; a streaming body runs until it ends or
/// is cancelled.
pub fn build_http_client(proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(concat!("MeowChat/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(constants::http::CONNECT_TIMEOUT);

    // Proxying is decided by config alone, not by ambient *_PROXY variables
    builder = match proxy {
        Some(url) => {
            info!("Routing outbound requests through proxy {}", url);
            let proxy =
                reqwest::Proxy::all(url).with_context(|| format!("Invalid proxy URL {}", url))?;
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    builder.build().context("Failed to build HTTP client")
}

/// Streaming chat client for the gateway endpoint
pub struct ChatClient {
    http: Client,
    config: ClientConfig,
    signer: Signer,
}

impl ChatClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(config.proxy.as_deref())?;
        let signer = Signer::new(config.secret_key.clone());
        Ok(Self {
            http,
            config,
            signer,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http
    }

    /// Request builder bound to this client's settings
    pub fn request_builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.signer, self.config.max_history_messages)
    }

    /// Turn a non-2xx response into a session error
    pub(crate) async fn handle_error_response(&self, response: reqwest::Response) -> ChatError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("API error response: {} - {}", status, error_text);
        error_from_body(status.as_u16(), &error_text)
    }
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

/// Map an error body (`{error: {code?, message}}` or free text) to a [`ChatError`]
pub(crate) fn error_from_body(status: u16, body: &str) -> ChatError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let (code, message) = match parsed {
        Some(err) if !err.message.is_empty() => (err.code, err.message),
        Some(err) => (err.code, format!("HTTP {}", status)),
        None if !body.trim().is_empty() => (None, body.trim().to_string()),
        None => (None, format!("HTTP {}", status)),
    };

    if status == 401 {
        ChatError::Auth(message)
    } else {
        ChatError::Upstream {
            status,
            code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_with_code() {
        let err = error_from_body(
            500,
            r#"{"error":{"code":"connect_error","message":"connection refused"}}"#,
        );
        assert_eq!(
            err,
            ChatError::Upstream {
                status: 500,
                code: Some("connect_error".to_string()),
                message: "connection refused".to_string(),
            }
        );
    }

    #[test]
    fn test_unauthorized_maps_to_auth() {
        let err = error_from_body(401, r#"{"error":{"message":"Invalid password."}}"#);
        assert_eq!(err, ChatError::Auth("Invalid password.".to_string()));
    }

    #[test]
    fn test_plain_text_body() {
        match error_from_body(502, "Bad Gateway") {
            ChatError::Upstream { message, code, .. } => {
                assert_eq!(message, "Bad Gateway");
                assert!(code.is_none());
            }
            other => panic!("Expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_uses_status() {
        match error_from_body(503, "") {
            ChatError::Upstream { message, .. } => assert_eq!(message, "HTTP 503"),
            other => panic!("Expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        assert!(build_http_client(Some("not a url")).is_err());
    }
}

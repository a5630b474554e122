//! Generate endpoint
//!
//! Validates a signed chat request, forwards it to the configured model
//! server and relays the upstream response body untouched.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::ai::client::build_http_client;
use crate::ai::types::{ChatMessage, Protocol};
use crate::auth::{PasswordList, Signer};
use crate::config::ChatConfig;
use crate::constants;

/// Request body accepted by the endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IncomingRequest {
    pub messages: Option<Vec<ChatMessage>>,
    pub time: i64,
    pub pass: Option<String>,
    pub sign: String,
    pub temperature: Option<f32>,
}

/// Shared handler state
#[derive(Clone)]
pub struct GatewayState {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: ChatConfig,
    passwords: PasswordList,
    signer: Signer,
}

impl GatewayState {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = build_http_client(config.outbound_proxy())?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                passwords: config.passwords(),
                signer: config.signer(),
                config,
            }),
        })
    }
}

/// A request refused before reaching upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: &'static str,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

impl GatewayState {
    /// Check presence, password and signature, in that order
    pub fn validate<'r>(
        &self,
        request: &'r IncomingRequest,
        now: i64,
    ) -> Result<&'r [ChatMessage], Rejection> {
        let messages = request.messages.as_deref().ok_or(Rejection {
            status: StatusCode::BAD_REQUEST,
            message: "No input text.",
        })?;

        if !self.inner.passwords.accepts(request.pass.as_deref()) {
            return Err(Rejection {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid password.",
            });
        }

        if self.inner.config.verify_signature {
            let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
            if !self
                .inner
                .signer
                .verify(request.time, last, &request.sign, now)
            {
                return Err(Rejection {
                    status: StatusCode::UNAUTHORIZED,
                    message: "Invalid signature.",
                });
            }
        }

        Ok(messages)
    }

    /// Upstream URL and JSON payload for the configured protocol
    pub fn upstream_request(&self, messages: &[ChatMessage], temperature: f32) -> (String, Value) {
        let config = &self.inner.config;
        match config.protocol {
            Protocol::Ollama => (
                format!("{}/api/chat", config.ollama.base_url.trim_end_matches('/')),
                json!({
                    "model": config.ollama.model,
                    "messages": messages,
                    "options": { "temperature": temperature },
                    "stream": true,
                }),
            ),
            Protocol::OpenAi => (
                format!(
                    "{}/v1/chat/completions",
                    config.openai.base_url.trim_end_matches('/')
                ),
                json!({
                    "model": config.openai.model,
                    "messages": messages,
                    "temperature": temperature,
                    "stream": true,
                }),
            ),
        }
    }
}

async fn generate(
    State(state): State<GatewayState>,
    Json(request): Json<IncomingRequest>,
) -> Response {
    let now = chrono::Utc::now().timestamp_millis();
    let messages = match state.validate(&request, now) {
        Ok(messages) => messages,
        Err(rejection) => {
            warn!("Rejected generate request: {}", rejection.message);
            return rejection.into_response();
        }
    };

    let temperature = request
        .temperature
        .unwrap_or(constants::chat::DEFAULT_TEMPERATURE);
    let (url, payload) = state.upstream_request(messages, temperature);
    info!(
        "Forwarding {} messages to {} (temperature {})",
        messages.len(),
        url,
        temperature
    );

    let mut upstream = state.inner.http.post(&url).json(&payload);
    if state.inner.config.protocol == Protocol::OpenAi {
        if let Some(key) = &state.inner.config.openai.api_key {
            upstream = upstream.bearer_auth(key);
        }
    }

    match upstream.send().await {
        Ok(response) => relay(response),
        Err(e) => {
            error!("Upstream fetch failed: {}", e);
            fetch_failure(&e)
        }
    }
}

/// Pass the upstream status, content type and body through unchanged
fn relay(response: reqwest::Response) -> Response {
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut builder = Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder
        .body(Body::from_stream(response.bytes_stream()))
        .unwrap_or_else(|e| {
            error!("Failed to build relay response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

fn fetch_failure(e: &reqwest::Error) -> Response {
    let code = if e.is_timeout() {
        "TimeoutError"
    } else if e.is_connect() {
        "ConnectError"
    } else {
        "FetchError"
    };
    let body = json!({ "error": { "code": code, "message": e.to_string() } });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Router exposing the generate route
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(constants::http::GENERATE_ROUTE, post(generate))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
pub async fn serve(config: ChatConfig, addr: SocketAddr) -> Result<()> {
    let protocol = config.protocol;
    let app = router(GatewayState::new(config)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Gateway listening on http://{} ({} upstream)",
        listener.local_addr()?,
        protocol
    );
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::sign;

    const NOW: i64 = 1_700_000_000_000;

    fn state(mutate: impl FnOnce(&mut ChatConfig)) -> GatewayState {
        let mut config = ChatConfig::default();
        config.secret_key = "meow".to_string();
        mutate(&mut config);
        GatewayState::new(config).unwrap()
    }

    fn signed(messages: Vec<ChatMessage>, pass: Option<&str>) -> IncomingRequest {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        IncomingRequest {
            sign: sign(NOW, &last, "meow"),
            messages: Some(messages),
            time: NOW,
            pass: pass.map(str::to_string),
            temperature: Some(0.6),
        }
    }

    #[test]
    fn test_missing_messages() {
        let state = state(|_| {});
        let err = state
            .validate(&IncomingRequest::default(), NOW)
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No input text.");
    }

    #[test]
    fn test_password_checked_before_signature() {
        let state = state(|c| c.site_password = "a, b".to_string());
        let mut request = signed(vec![ChatMessage::user("hi")], Some("c"));
        request.sign = "bogus".to_string();
        let err = state.validate(&request, NOW).unwrap_err();
        assert_eq!(err.message, "Invalid password.");

        let request = signed(vec![ChatMessage::user("hi")], Some("b"));
        assert!(state.validate(&request, NOW).is_ok());
    }

    #[test]
    fn test_signature_rejected() {
        let state = state(|_| {});
        let mut request = signed(vec![ChatMessage::user("hi")], None);
        request.messages = Some(vec![ChatMessage::user("tampered")]);
        let err = state.validate(&request, NOW).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Invalid signature.");

        // Stale timestamp
        let request = signed(vec![ChatMessage::user("hi")], None);
        assert!(state.validate(&request, NOW + 10 * 60 * 1000).is_err());
    }

    #[test]
    fn test_extreme_timestamp_rejected() {
        let state = state(|_| {});
        for time in [i64::MIN, i64::MAX] {
            let mut request = signed(vec![ChatMessage::user("hi")], None);
            request.time = time;
            request.sign = sign(time, "hi", "meow");
            let err = state.validate(&request, NOW).unwrap_err();
            assert_eq!(err.message, "Invalid signature.");
        }
    }

    #[test]
    fn test_signature_check_can_be_disabled() {
        let state = state(|c| c.verify_signature = false);
        let mut request = signed(vec![ChatMessage::user("hi")], None);
        request.sign = String::new();
        assert_eq!(state.validate(&request, NOW).unwrap().len(), 1);
    }

    #[test]
    fn test_ollama_payload() {
        let state = state(|c| {
            c.ollama.base_url = "http://model:11434/".to_string();
            c.ollama.model = "llama3".to_string();
        });
        let messages = vec![ChatMessage::system("be a cat"), ChatMessage::user("2+2?")];
        let (url, payload) = state.upstream_request(&messages, 0.6);
        assert_eq!(url, "http://model:11434/api/chat");
        assert_eq!(payload["model"], "llama3");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "2+2?");
        assert!((payload["options"]["temperature"].as_f64().unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_openai_payload() {
        let state = state(|c| {
            c.protocol = Protocol::OpenAi;
            c.openai.base_url = "https://api.example.com".to_string();
            c.openai.model = "gpt-4o".to_string();
        });
        let (url, payload) = state.upstream_request(&[ChatMessage::user("hi")], 0.2);
        assert_eq!(url, "https://api.example.com/v1/chat/completions");
        assert_eq!(payload["model"], "gpt-4o");
        assert!(payload.get("options").is_none());
        assert!((payload["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_rejection_body_shape() {
        let response = Rejection {
            status: StatusCode::UNAUTHORIZED,
            message: "Invalid password.",
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

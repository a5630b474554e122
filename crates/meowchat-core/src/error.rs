//! Error taxonomy for chat requests and session transitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that terminate a streaming request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    /// Empty submission
    #[error("no input text")]
    Input,

    /// Bad password or signature
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Fetch-level failure (connection refused, reset mid-body, ...)
    #[error("network error: {0}")]
    Network(String),

    /// Malformed stream payload
    #[error("decode error: {0}")]
    Decode(String),

    /// Non-2xx from the gateway or inference backend
    #[error("upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl ChatError {
    /// Short machine-readable code for the error element
    pub fn code(&self) -> Option<String> {
        match self {
            ChatError::Input => Some("input_error".to_string()),
            ChatError::Auth(_) => Some("auth_error".to_string()),
            ChatError::Network(_) => Some("network_error".to_string()),
            ChatError::Decode(_) => Some("decode_error".to_string()),
            ChatError::Upstream { code, status, .. } => {
                Some(code.clone().unwrap_or_else(|| status.to_string()))
            }
        }
    }

    /// Convert into the UI-facing error state
    pub fn to_error_message(&self) -> ErrorMessage {
        let message = match self {
            ChatError::Upstream { message, .. } => message.clone(),
            ChatError::Auth(message) => message.clone(),
            other => other.to_string(),
        };
        ErrorMessage {
            code: self.code(),
            message,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Network(err.to_string())
    }
}

/// Error state rendered by the UI, also the wire shape of `{error: {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Rejected session transitions
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A request is already streaming
    #[error("a response is already streaming")]
    Busy,

    /// Retry needs a previous exchange
    #[error("nothing to retry")]
    NothingToRetry,

    /// The operation is only valid while idle
    #[error("cancel the streaming response first")]
    StreamingInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_message_keeps_backend_text() {
        let err = ChatError::Upstream {
            status: 500,
            code: Some("ECONNREFUSED".to_string()),
            message: "connect failed".to_string(),
        };
        let msg = err.to_error_message();
        assert_eq!(msg.code.as_deref(), Some("ECONNREFUSED"));
        assert_eq!(msg.message, "connect failed");
    }

    #[test]
    fn test_upstream_error_without_code_uses_status() {
        let err = ChatError::Upstream {
            status: 401,
            code: None,
            message: "Invalid password.".to_string(),
        };
        assert_eq!(err.code().as_deref(), Some("401"));
    }

    #[test]
    fn test_decode_error_message() {
        let msg = ChatError::Decode("bad json".to_string()).to_error_message();
        assert_eq!(msg.code.as_deref(), Some("decode_error"));
        assert!(msg.message.contains("bad json"));
    }

    #[test]
    fn test_error_message_wire_shape() {
        let parsed: ErrorMessage = serde_json::from_str(r#"{"message":"No input text."}"#).unwrap();
        assert_eq!(parsed.code, None);
        assert_eq!(parsed.message, "No input text.");

        let json = serde_json::to_value(&parsed).unwrap();
        assert!(json.get("code").is_none());
    }
}

//! Chat data model shared by the client, session and gateway

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Wire protocol of the streamed response body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Complete JSON objects back to back (Ollama `/api/chat`)
    #[default]
    Ollama,
    /// `data: {...}` event frames (OpenAI chat/completions)
    OpenAi,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ollama => f.write_str("ollama"),
            Protocol::OpenAi => f.write_str("openai"),
        }
    }
}

impl FromStr for Protocol {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Protocol::Ollama),
            "openai" => Ok(Protocol::OpenAi),
            other => Err(anyhow::anyhow!("unknown protocol: {}", other)),
        }
    }
}

/// One parsed server object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFrame {
    pub text_delta: String,
    pub is_final: bool,
}

impl StreamFrame {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text_delta: text.into(),
            is_final: false,
        }
    }

    pub fn done() -> Self {
        Self {
            text_delta: String::new(),
            is_final: true,
        }
    }
}

/// What the orchestrator relays to its caller
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    /// Incremental assistant text
    TextDelta { delta: String },
    /// Explicit end-of-stream
    Finish,
    /// Terminal failure; no further parts follow
    Error(ChatError),
}

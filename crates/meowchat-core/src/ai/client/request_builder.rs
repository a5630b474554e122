//! Outgoing payload construction

use serde::{Deserialize, Serialize};

use crate::ai::types::ChatMessage;
use crate::auth::Signer;

/// Body posted to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    /// Milliseconds since the epoch, covered by `sign`
    pub time: i64,
    pub pass: Option<String>,
    pub sign: String,
    pub temperature: f32,
}

/// Builds [`GenerateRequest`]s from session state
pub struct RequestBuilder<'a> {
    signer: &'a Signer,
    max_history_messages: usize,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(signer: &'a Signer, max_history_messages: usize) -> Self {
        Self {
            signer,
            max_history_messages,
        }
    }

    /// Most recent history window, with the system prompt prepended when set
    pub fn build_messages(&self, history: &[ChatMessage], system_prompt: &str) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(self.max_history_messages);
        let mut messages = Vec::with_capacity(history.len() - start + 1);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
        messages.extend_from_slice(&history[start..]);
        messages
    }

    /// Full request body, signed at `now`
    pub fn build(
        &self,
        history: &[ChatMessage],
        system_prompt: &str,
        temperature: f32,
        password: Option<&str>,
        now: i64,
    ) -> GenerateRequest {
        let messages = self.build_messages(history, system_prompt);
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let sign = self.signer.sign(now, last);
        GenerateRequest {
            messages,
            time: now,
            pass: password.map(str::to_string),
            sign,
            temperature,
        }
    }
}

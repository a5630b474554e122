//! Session state and transitions

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{SessionEvent, SessionObserver};
use crate::ai::client::ChatTurn;
use crate::ai::types::{ChatMessage, Role};
use crate::constants;
use crate::error::{ChatError, ErrorMessage, SessionError};

/// Aggregate session state
///
/// `cancel_handle` is present exactly while a response is streaming, so
/// [`SessionState::is_streaming`] cannot disagree with it.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub history: Vec<ChatMessage>,
    pub pending_assistant_text: String,
    pub error_state: Option<ErrorMessage>,
    pub temperature: f32,
    pub system_prompt: String,
    pub stick_to_bottom: bool,
    cancel_handle: Option<CancellationToken>,
}

impl SessionState {
    pub fn is_streaming(&self) -> bool {
        self.cancel_handle.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            pending_assistant_text: String::new(),
            error_state: None,
            temperature: constants::chat::DEFAULT_TEMPERATURE,
            system_prompt: constants::chat::DEFAULT_SYSTEM_PROMPT.to_string(),
            stick_to_bottom: true,
            cancel_handle: None,
        }
    }
}

/// Single-writer owner of a conversation
#[derive(Default)]
pub struct ChatSession {
    state: SessionState,
    observers: Vec<SessionObserver>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with explicit settings and empty history
    pub fn with_settings(system_prompt: impl Into<String>, temperature: f32) -> Self {
        let mut session = Self::default();
        session.state.system_prompt = system_prompt.into();
        session.state.temperature = clamp_temperature(temperature);
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.state.history
    }

    pub fn pending_text(&self) -> &str {
        &self.state.pending_assistant_text
    }

    pub fn error(&self) -> Option<&ErrorMessage> {
        self.state.error_state.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming()
    }

    /// Token that aborts the in-flight request
    pub fn cancel_handle(&self) -> Option<CancellationToken> {
        self.state.cancel_handle.clone()
    }

    /// Register a render callback
    pub fn subscribe(&mut self, observer: SessionObserver) {
        self.observers.push(observer);
    }

    fn emit(&self, event: SessionEvent) {
        for observer in &self.observers {
            observer(&event, &self.state);
        }
    }

    /// Submit user input
    ///
    /// Blank input is ignored (`Ok(None)`). Otherwise the message is appended
    /// and the returned turn must be handed to a backend.
    pub fn submit(&mut self, input: &str) -> Result<Option<ChatTurn>, SessionError> {
        if self.is_streaming() {
            warn!("Submit rejected: response already streaming");
            return Err(SessionError::Busy);
        }
        if input.trim().is_empty() {
            debug!("Ignoring empty submission");
            return Ok(None);
        }

        let message = ChatMessage::user(input);
        self.state.history.push(message.clone());
        self.emit(SessionEvent::UserMessage(message));
        Ok(Some(self.begin_turn()))
    }

    /// Replay the last user message
    ///
    /// A trailing assistant message is removed first. After a failed request
    /// the history already ends with the user message, which is replayed as is.
    pub fn retry(&mut self) -> Result<ChatTurn, SessionError> {
        if self.is_streaming() {
            return Err(SessionError::Busy);
        }

        match self.state.history.last().map(|m| m.role) {
            Some(Role::Assistant) => {
                if let Some(removed) = self.state.history.pop() {
                    info!("Retry: removed last assistant message");
                    self.emit(SessionEvent::Retracted(removed));
                }
            }
            Some(Role::User) => {}
            _ => return Err(SessionError::NothingToRetry),
        }

        if !matches!(self.state.history.last().map(|m| m.role), Some(Role::User)) {
            return Err(SessionError::NothingToRetry);
        }
        Ok(self.begin_turn())
    }

    /// Enter `Streaming`
    fn begin_turn(&mut self) -> ChatTurn {
        let cancel = CancellationToken::new();
        self.state.pending_assistant_text.clear();
        self.state.error_state = None;
        self.state.cancel_handle = Some(cancel.clone());
        self.emit(SessionEvent::StreamStarted);

        ChatTurn {
            history: self.state.history.clone(),
            system_prompt: self.state.system_prompt.clone(),
            temperature: self.state.temperature,
            password: None,
            cancel,
        }
    }

    /// Append a delta to the pending assistant message
    pub fn push_delta(&mut self, delta: &str) {
        if !self.is_streaming() {
            warn!("Dropping delta received while idle");
            return;
        }
        if delta.is_empty() {
            return;
        }
        self.state.pending_assistant_text.push_str(delta);
        self.emit(SessionEvent::Delta(delta.to_string()));
    }

    /// Move non-empty pending text into history
    fn archive_pending(&mut self) -> Option<ChatMessage> {
        let text = std::mem::take(&mut self.state.pending_assistant_text);
        if text.is_empty() {
            return None;
        }
        let message = ChatMessage::assistant(text);
        self.state.history.push(message.clone());
        Some(message)
    }

    /// End-of-stream received
    pub fn complete(&mut self) {
        if self.state.cancel_handle.take().is_none() {
            warn!("Completion received while idle");
            return;
        }
        match self.archive_pending() {
            Some(message) => {
                debug!("Archived assistant message ({} chars)", message.content.len());
                self.emit(SessionEvent::Archived(message));
            }
            None => self.emit(SessionEvent::Finished),
        }
    }

    /// Abort the in-flight request, keeping whatever text arrived
    ///
    /// Returns false when nothing was streaming.
    pub fn cancel(&mut self) -> bool {
        match self.state.cancel_handle.as_ref() {
            Some(token) => {
                token.cancel();
                self.finish_cancelled();
                true
            }
            None => false,
        }
    }

    /// The token was cancelled; archive partial text and go idle
    pub(crate) fn finish_cancelled(&mut self) {
        if self.state.cancel_handle.take().is_none() {
            return;
        }
        info!(
            "Stream cancelled with {} chars pending",
            self.state.pending_assistant_text.len()
        );
        if let Some(message) = self.archive_pending() {
            self.emit(SessionEvent::Archived(message));
        }
        self.emit(SessionEvent::Cancelled);
    }

    /// Decode or network failure: record the error and drop pending text
    pub fn fail(&mut self, error: &ChatError) {
        if let Some(token) = self.state.cancel_handle.take() {
            token.cancel();
        }
        self.state.pending_assistant_text.clear();
        let message = error.to_error_message();
        warn!("Request failed: {}", error);
        self.state.error_state = Some(message.clone());
        self.emit(SessionEvent::Failed(message));
    }

    /// Hide the error element
    pub fn dismiss_error(&mut self) {
        if self.state.error_state.take().is_some() {
            self.emit(SessionEvent::SettingsChanged);
        }
    }

    /// Empty history, pending text and error state
    pub fn clear(&mut self) -> Result<(), SessionError> {
        if self.is_streaming() {
            return Err(SessionError::StreamingInProgress);
        }
        self.state.history.clear();
        self.state.pending_assistant_text.clear();
        self.state.error_state = None;
        self.emit(SessionEvent::Cleared);
        Ok(())
    }

    /// Replace the system prompt (idle only)
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) -> Result<(), SessionError> {
        if self.is_streaming() {
            return Err(SessionError::StreamingInProgress);
        }
        self.state.system_prompt = prompt.into();
        self.emit(SessionEvent::SettingsChanged);
        Ok(())
    }

    /// Set the sampling temperature, clamped to `[0, 1]`
    pub fn set_temperature(&mut self, temperature: f32) {
        self.state.temperature = clamp_temperature(temperature);
        self.emit(SessionEvent::SettingsChanged);
    }

    pub fn set_stick_to_bottom(&mut self, stick: bool) {
        self.state.stick_to_bottom = stick;
        self.emit(SessionEvent::SettingsChanged);
    }

    pub fn toggle_stick_to_bottom(&mut self) -> bool {
        let stick = !self.state.stick_to_bottom;
        self.set_stick_to_bottom(stick);
        stick
    }

    /// Load persisted state (idle only)
    pub fn restore(
        &mut self,
        history: Option<Vec<ChatMessage>>,
        system_prompt: Option<String>,
        stick_to_bottom: bool,
    ) -> Result<(), SessionError> {
        if self.is_streaming() {
            return Err(SessionError::StreamingInProgress);
        }
        if let Some(history) = history {
            self.state.history = history;
        }
        if let Some(prompt) = system_prompt {
            self.state.system_prompt = prompt;
        }
        self.state.stick_to_bottom = stick_to_bottom;
        self.emit(SessionEvent::SettingsChanged);
        Ok(())
    }
}

fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_nan() {
        return constants::chat::DEFAULT_TEMPERATURE;
    }
    temperature.clamp(0.0, 1.0)
}

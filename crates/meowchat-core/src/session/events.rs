//! Session notifications for renderers

use crate::ai::types::ChatMessage;
use crate::error::ErrorMessage;

use super::state::SessionState;

/// Emitted after every session mutation
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A user message was appended to history
    UserMessage(ChatMessage),
    /// A request started; the pending slot is empty
    StreamStarted,
    /// Text appended to the pending assistant message
    Delta(String),
    /// The pending message was archived into history
    Archived(ChatMessage),
    /// The stream ended without producing text
    Finished,
    /// Streaming stopped by the user; any partial text was archived
    Cancelled,
    /// The request failed; pending text was discarded
    Failed(ErrorMessage),
    /// The last assistant message was removed for a retry
    Retracted(ChatMessage),
    /// History, pending text and error were cleared
    Cleared,
    /// System prompt, temperature, stick-to-bottom or restored history changed
    SettingsChanged,
}

/// Render callback registered on a session
pub type SessionObserver = Box<dyn Fn(&SessionEvent, &SessionState) + Send>;

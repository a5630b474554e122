//! MeowChat Core - streaming chat client, session model and gateway
//!
//! - Incremental decoders for newline-delimited JSON and SSE streams
//! - A signed streaming client for the generate endpoint
//! - The chat session state machine with cancellation and retry
//! - Tab-scoped and durable persistence
//! - An axum gateway that forwards to Ollama or OpenAI

pub mod ai;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod paths;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use ai::client::{ChatBackend, ChatClient, ChatTurn, ClientConfig};
pub use ai::types::{ChatMessage, Protocol, Role, StreamFrame, StreamPart};
pub use config::ChatConfig;
pub use error::{ChatError, ErrorMessage, SessionError};
pub use session::{ChatSession, SessionEvent, SessionObserver, SessionState, TurnOutcome};
pub use storage::{Database, KeyValueStore, PersistenceBridge, Preferences, ScratchStore};

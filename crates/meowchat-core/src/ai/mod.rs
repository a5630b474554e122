//! Model-facing layer
//!
//! Data model, stream decoding and the streaming chat client.

pub mod client;
pub mod decoder;
pub mod types;

pub use client::{ChatBackend, ChatClient, ClientConfig, ChatTurn};
pub use types::{ChatMessage, Protocol, Role, StreamFrame, StreamPart};

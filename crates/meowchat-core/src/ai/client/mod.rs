//! Request orchestration
//!
//! Builds the outgoing payload, calls the gateway and drives the stream decoder.

pub mod config;
pub mod core;
pub mod request_builder;
pub mod streaming;

pub use config::ClientConfig;
pub use self::core::{build_http_client, ChatClient};
pub use request_builder::{GenerateRequest, RequestBuilder};
pub use streaming::{ChatBackend, ChatTurn};

//! Persistence layer
//!
//! - Tab-scoped scratch storage for history and system prompt
//! - SQLite preferences for settings that outlive a session

mod bridge;
mod database;
#[cfg(test)]
mod database_tests;
mod kv;
mod preferences;
mod scratch;

pub use bridge::PersistenceBridge;
pub use database::Database;
pub use kv::{KeyValueStore, MemoryStore};
pub use preferences::Preferences;
pub use scratch::ScratchStore;

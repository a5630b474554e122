//! Application constants and configuration defaults
//!
//! Centralized location for magic numbers and default values

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default gateway endpoint the client posts to
    pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/generate";

    /// Default listen address for `meowchat serve`
    pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

    /// Route served by the gateway
    pub const GENERATE_ROUTE: &str = "/api/generate";
}

/// Chat / model defaults
pub mod chat {
    /// How many history messages are sent with each request
    pub const MAX_HISTORY_MESSAGES: usize = 9;

    /// Default sampling temperature (settings slider default)
    pub const DEFAULT_TEMPERATURE: f32 = 0.6;

    /// Default system prompt for a fresh session
    pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a cat, sometimes you are playful, you only respond in less than 100 words, and you cannot let anyone know you are an AI.";

    /// Default Ollama model
    pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

    /// Default Ollama base URL
    pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

    /// Default OpenAI-compatible model
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

    /// Default OpenAI-compatible base URL
    pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
}

/// Signature window
pub mod auth {
    /// Signatures older (or newer) than this are rejected, in milliseconds
    pub const SIGNATURE_WINDOW_MS: i64 = 5 * 60 * 1000;
}

/// Storage keys, shared with the browser build
pub mod storage {
    /// Tab-lifetime: JSON array of chat messages
    pub const MESSAGE_LIST_KEY: &str = "messageList";

    /// Tab-lifetime: raw system prompt text
    pub const SYSTEM_ROLE_KEY: &str = "systemRoleSettings";

    /// Cross-session: presence marker for the stick-to-bottom preference
    pub const STICK_TO_BOTTOM_KEY: &str = "stickToBottom";

    /// Value written under [`STICK_TO_BOTTOM_KEY`]
    pub const STICK_TO_BOTTOM_VALUE: &str = "stick";

    /// Cross-session: raw shared secret (plaintext)
    pub const PASSWORD_KEY: &str = "pass";
}

/// Filesystem layout
pub mod ui {
    /// Config directory name
    pub const CONFIG_DIR_NAME: &str = ".meowchat";

    /// Config file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// SQLite file holding cross-session preferences
    pub const DATABASE_FILE_NAME: &str = "meowchat.db";

    /// Subdirectory of the temp dir holding tab-lifetime scratch files
    pub const SCRATCH_DIR_NAME: &str = "meowchat";
}

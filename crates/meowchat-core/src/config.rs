//! Layered configuration
//!
//! Built-in defaults, then the optional `~/.meowchat/config.toml`, then
//! environment variables.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai::types::Protocol;
use crate::auth::{PasswordList, Signer};
use crate::constants;
use crate::paths;

/// Which network runtime the gateway runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    /// Long-running process; outbound proxy allowed
    #[default]
    Standalone,
    /// Edge runtime; outbound proxy unavailable
    Edge,
}

/// Ollama upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: constants::chat::DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: constants::chat::DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

/// OpenAI-compatible upstream (dormant path)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: constants::chat::DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: constants::chat::DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

/// Everything the client and the gateway need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Most recent history messages sent per request
    pub max_history_messages: usize,
    /// Comma-separated accepted passwords; empty disables the gate
    pub site_password: String,
    /// Outbound proxy for upstream calls
    pub https_proxy: Option<String>,
    /// Signature secret shared by client and gateway; may be empty
    pub secret_key: String,
    /// Stream protocol spoken by the upstream
    pub protocol: Protocol,
    /// Gateway URL the client posts to
    pub endpoint: String,
    /// Whether the gateway enforces request signatures
    pub verify_signature: bool,
    pub deploy_target: DeployTarget,
    pub ollama: OllamaConfig,
    pub openai: OpenAiConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_messages: constants::chat::MAX_HISTORY_MESSAGES,
            site_password: String::new(),
            https_proxy: None,
            secret_key: String::new(),
            protocol: Protocol::default(),
            endpoint: constants::http::DEFAULT_ENDPOINT.to_string(),
            verify_signature: true,
            deploy_target: DeployTarget::default(),
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Load defaults, the user config file and the process environment
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(&paths::config_file())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a TOML config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MAX_HISTORY_MESSAGES") {
            match raw.trim().parse::<usize>() {
                Ok(n) => self.max_history_messages = n,
                Err(_) => warn!("Ignoring invalid MAX_HISTORY_MESSAGES={:?}", raw),
            }
        }
        if let Some(v) = lookup("SITE_PASSWORD") {
            self.site_password = v;
        }
        if let Some(v) = lookup("HTTPS_PROXY").filter(|v| !v.is_empty()) {
            self.https_proxy = Some(v);
        }
        if let Some(v) = lookup("PUBLIC_SECRET_KEY") {
            self.secret_key = v;
        }
        if let Some(raw) = lookup("MEOWCHAT_PROTOCOL") {
            match raw.parse() {
                Ok(p) => self.protocol = p,
                Err(e) => warn!("Ignoring MEOWCHAT_PROTOCOL: {}", e),
            }
        }
        if let Some(v) = lookup("MEOWCHAT_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(raw) = lookup("MEOWCHAT_VERIFY_SIGNATURE") {
            self.verify_signature = !matches!(raw.trim(), "0" | "false" | "no" | "off");
        }
        if let Some(raw) = lookup("MEOWCHAT_DEPLOY_TARGET") {
            self.deploy_target = match raw.trim() {
                "edge" | "vercel" | "netlify" => DeployTarget::Edge,
                _ => DeployTarget::Standalone,
            };
        }
        if let Some(v) = lookup("OLLAMA_BASE_URL") {
            self.ollama.base_url = v;
        }
        if let Some(v) = lookup("OLLAMA_MODEL") {
            self.ollama.model = v;
        }
        if let Some(v) = lookup("OPENAI_API_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = lookup("OPENAI_API_MODEL") {
            self.openai.model = v;
        }
    }

    /// Proxy to use for outbound calls, if the deploy target allows one
    pub fn outbound_proxy(&self) -> Option<&str> {
        match self.deploy_target {
            DeployTarget::Standalone => self.https_proxy.as_deref(),
            DeployTarget::Edge => None,
        }
    }

    pub fn passwords(&self) -> PasswordList {
        PasswordList::parse(&self.site_password)
    }

    pub fn signer(&self) -> Signer {
        Signer::new(self.secret_key.clone())
    }
}

//! MeowChat - a terminal chat client for a cat-themed assistant
//!
//! - `meowchat chat`: line-based chat with streaming answers
//! - `meowchat serve`: the generate gateway in front of Ollama or OpenAI

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use meowchat_core::{constants, gateway, paths, ChatConfig};

mod chat;
mod commands;

/// MeowChat
#[derive(Parser)]
#[command(name = "meowchat")]
#[command(about = "Chat with a cat, one streamed token at a time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session (default)
    Chat {
        /// Scratch storage id; history lives as long as this id is reused
        #[arg(long, default_value = "default")]
        tab: String,

        /// Generate endpoint URL, overriding config
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Run the generate gateway
    Serve {
        /// Address to listen on
        #[arg(long, default_value = constants::http::DEFAULT_LISTEN_ADDR)]
        listen: SocketAddr,
    },
}

/// Log to a file so output doesn't interleave with the chat
fn init_file_logging() {
    let log_dir = paths::logs_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match std::fs::File::create(log_dir.join("meowchat.log")) {
        Ok(log_file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { listen }) => {
            init_stderr_logging();
            let config = ChatConfig::load().context("Failed to load configuration")?;
            gateway::serve(config, listen).await
        }
        Some(Commands::Chat { tab, endpoint }) => {
            init_file_logging();
            chat::run(chat::ChatOptions { tab, endpoint }).await
        }
        None => {
            init_file_logging();
            chat::run(chat::ChatOptions {
                tab: "default".to_string(),
                endpoint: None,
            })
            .await
        }
    }
}

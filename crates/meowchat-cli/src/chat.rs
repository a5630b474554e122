//! Line-based chat loop

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use meowchat_core::{
    paths, ChatBackend, ChatClient, ChatConfig, ChatSession, ChatTurn, ClientConfig, Database,
    PersistenceBridge, Preferences, ScratchStore, SessionEvent, SessionState, TurnOutcome,
};

use crate::commands::{Command, HELP};

pub struct ChatOptions {
    pub tab: String,
    pub endpoint: Option<String>,
}

pub async fn run(options: ChatOptions) -> Result<()> {
    let mut config = ChatConfig::load()?;
    if let Some(endpoint) = options.endpoint {
        config.endpoint = endpoint;
    }
    info!("Chat session on tab '{}' -> {}", options.tab, config.endpoint);

    let client = ChatClient::new(ClientConfig::from(&config))?;
    let scratch = ScratchStore::for_tab(&options.tab);
    let prefs = Preferences::new(Database::new(&paths::database_file())?);
    let bridge = PersistenceBridge::new(&scratch, &prefs);

    let mut session = ChatSession::new();
    bridge.restore(&mut session)?;
    session.subscribe(Box::new(render));

    println!(
        "meowchat ({} messages restored). /help for commands.",
        session.history().len()
    );

    let mut interrupts = listen_for_interrupts();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        // Ctrl-C at the prompt exits
        let line = tokio::select! {
            line = lines.next_line() => line?,
            Some(()) = interrupts.recv() => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let turn = match Command::parse(&line) {
            Command::Send(text) => match session.submit(&text) {
                Ok(turn) => turn,
                Err(e) => {
                    println!("{}", e);
                    None
                }
            },
            Command::Retry => match session.retry() {
                Ok(turn) => Some(turn),
                Err(e) => {
                    println!("{}", e);
                    None
                }
            },
            Command::Clear => {
                if let Err(e) = session.clear() {
                    println!("{}", e);
                }
                None
            }
            Command::System(None) => {
                println!("{}", session.state().system_prompt);
                None
            }
            Command::System(Some(prompt)) => {
                if let Err(e) = session.set_system_prompt(prompt) {
                    println!("{}", e);
                }
                None
            }
            Command::Temperature(None) => {
                println!("temperature: {}", session.state().temperature);
                None
            }
            Command::Temperature(Some(t)) => {
                session.set_temperature(t);
                println!("temperature: {}", session.state().temperature);
                None
            }
            Command::Stick => {
                let on = session.toggle_stick_to_bottom();
                println!("stick to bottom: {}", if on { "on" } else { "off" });
                None
            }
            Command::Password(secret) => {
                prefs.set_password(&secret)?;
                println!(
                    "{}",
                    if secret.is_empty() { "Password forgotten." } else { "Password saved." }
                );
                None
            }
            Command::History => {
                for message in session.history() {
                    println!("[{}] {}", message.role, message.content);
                }
                None
            }
            Command::DismissError => {
                session.dismiss_error();
                None
            }
            Command::Help => {
                println!("{}", HELP);
                None
            }
            Command::Quit => break,
            Command::Invalid(message) => {
                println!("{}", message);
                None
            }
        };

        if let Some(mut turn) = turn {
            turn.password = prefs.password();
            stream_turn(&mut session, &client, turn, &mut interrupts).await;
        }

        if let Err(e) = bridge.snapshot(&session) {
            warn!("Failed to persist session: {}", e);
        }
    }

    bridge.snapshot(&session)?;
    Ok(())
}

/// Forward every SIGINT for the lifetime of the process
///
/// A single listener is installed so Ctrl-C keeps working after the first turn.
fn listen_for_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run one turn; an interrupt cancels it
async fn stream_turn(
    session: &mut ChatSession,
    backend: &dyn ChatBackend,
    turn: ChatTurn,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> TurnOutcome {
    let cancel = turn.cancel.clone();
    let run = session.run_turn(backend, turn);
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            Some(()) = interrupts.recv() => {
                info!("Interrupt received, cancelling turn");
                cancel.cancel();
            }
        }
    };

    // Interrupts that raced the end of the turn must not exit the prompt
    while interrupts.try_recv().is_ok() {}

    if let TurnOutcome::Failed(e) = &outcome {
        info!("Turn failed: {}", e);
    }
    outcome
}

fn render(event: &SessionEvent, state: &SessionState) {
    let mut out = std::io::stdout();
    let _ = match event {
        SessionEvent::Delta(delta) if state.stick_to_bottom => write!(out, "{}", delta),
        SessionEvent::StreamStarted if !state.stick_to_bottom => write!(out, "..."),
        SessionEvent::Archived(_) if state.stick_to_bottom => writeln!(out),
        SessionEvent::Archived(message) => writeln!(out, "\r{}", message.content),
        SessionEvent::Finished => writeln!(out),
        SessionEvent::Cancelled => writeln!(out, "[cancelled]"),
        SessionEvent::Failed(error) => match &error.code {
            Some(code) => writeln!(out, "\nerror ({}): {}", code, error.message),
            None => writeln!(out, "\nerror: {}", error.message),
        },
        SessionEvent::Retracted(_) => writeln!(out, "(regenerating)"),
        SessionEvent::Cleared => writeln!(out, "History cleared."),
        _ => Ok(()),
    };
    let _ = out.flush();
}

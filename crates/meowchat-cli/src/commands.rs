//! Slash command parsing
//!
//! Anything that does not start with `/` is a chat message.

/// One line of REPL input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(String),
    Retry,
    Clear,
    /// Show (`None`) or replace the system prompt
    System(Option<String>),
    /// Show (`None`) or set the temperature
    Temperature(Option<f32>),
    Stick,
    /// Store the site password; empty forgets it
    Password(String),
    History,
    DismissError,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return Command::Send(line.to_string());
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        match head.to_lowercase().as_str() {
            "/retry" | "/r" => Command::Retry,
            "/clear" => Command::Clear,
            "/system" => Command::System(arg),
            "/temp" | "/temperature" => match arg {
                None => Command::Temperature(None),
                Some(raw) => match raw.parse::<f32>() {
                    Ok(t) if t.is_finite() => Command::Temperature(Some(t)),
                    _ => Command::Invalid(format!("Not a number: {}", raw)),
                },
            },
            "/stick" => Command::Stick,
            "/pass" => Command::Password(rest.to_string()),
            "/history" => Command::History,
            "/dismiss" => Command::DismissError,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" | "/q" => Command::Quit,
            other => Command::Invalid(format!("Unknown command: {}", other)),
        }
    }
}

pub const HELP: &str = "\
Commands:
  /retry            regenerate the last answer
  /clear            forget the conversation
  /system [prompt]  show or set the system prompt
  /temp [0-1]       show or set the temperature
  /stick            toggle following streamed output
  /pass <secret>    remember the site password (empty to forget)
  /history          print the conversation
  /dismiss          hide the last error
  /quit             exit
Ctrl-C cancels a streaming answer, or exits at the prompt.";

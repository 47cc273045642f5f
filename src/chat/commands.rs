//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Reset the conversation to the greeting.
    Clear,

    /// Switch between the fast and the thinking model.
    Think(bool),

    /// Speak the n-th message (1-based, as listed by `/history`).
    /// `None` speaks the newest reply.
    Speak(Option<usize>),

    /// Stop speaking the n-th message; `None` stops everything.
    Stop(Option<usize>),

    /// Take the next prompt from the microphone.
    Listen,

    /// List the conversation.
    History,

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use gemchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/think on").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "reset" => ChatCommand::Clear,
        "think" | "thinking" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Think(value),
            None => ChatCommand::Invalid("/think expects 'on' or 'off'".to_string()),
        },
        "speak" | "say" => match parse_index(argument, "/speak") {
            Ok(index) => ChatCommand::Speak(index),
            Err(err) => ChatCommand::Invalid(err),
        },
        "stop" => match parse_index(argument, "/stop") {
            Ok(index) => ChatCommand::Stop(index),
            Err(err) => ChatCommand::Invalid(err),
        },
        "listen" | "mic" => ChatCommand::Listen,
        "history" => ChatCommand::History,
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_index(argument: Option<&str>, name: &str) -> Result<Option<usize>, String> {
    match argument {
        None => Ok(None),
        Some(arg) => match arg.parse::<usize>() {
            Ok(0) | Err(_) => Err(format!("{name} expects a message number (1 or more)")),
            Ok(value) => Ok(Some(value)),
        },
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Reset the conversation
  /think on|off          Use the thinking model (slower, more deliberate)
  /speak [n]             Read message n aloud (default: the latest reply)
  /stop [n]              Stop reading message n (default: everything)
  /listen                Dictate the next message
  /history               List the conversation with message numbers
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}

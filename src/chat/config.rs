//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_VOICE;
use crate::session::DEFAULT_SYSTEM_INSTRUCTION;
use crate::{Mode, SafetySetting, default_safety_settings};

/// Directory under `$HOME` that holds the saved history.
const HISTORY_DIR_NAME: &str = ".gemchat";

/// Command-line arguments for the gemchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Start with the thinking model.
    #[arrrg(flag, "Start in thinking mode (slower, more deliberate replies)")]
    pub thinking: bool,

    /// System instruction to set context for the conversation.
    #[arrrg(optional, "System instruction for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Prebuilt voice for speech.
    #[arrrg(optional, "Voice used to read replies aloud (default: Kore)", "VOICE")]
    pub voice: Option<String>,

    /// Where the history is saved.
    #[arrrg(optional, "Directory for the saved history (default: ~/.gemchat)", "DIR")]
    pub history_dir: Option<String>,

    /// Keep the history in memory only.
    #[arrrg(flag, "Do not load or save the history")]
    pub no_persist: bool,

    /// External program used to play speech.
    #[arrrg(optional, "Audio player command, e.g. \"aplay -q\"", "COMMAND")]
    pub player: Option<String>,

    /// Where API traffic is logged.
    #[arrrg(optional, "Append API requests and chunks to this file as JSON lines", "FILE")]
    pub log_file: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The mode the session starts in.
    pub mode: Mode,

    /// Standing instruction for the model.
    pub system_instruction: Option<String>,

    /// Prebuilt voice for speech synthesis.
    pub voice: String,

    /// Directory for the saved history; `None` keeps it in memory.
    pub history_dir: Option<PathBuf>,

    /// Player command for speech; `None` plays nothing.
    pub player: Option<String>,

    /// JSON-lines log of API traffic.
    pub log_file: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Per-category blocking thresholds.
    pub safety_settings: Vec<SafetySetting>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Mode: fast
    /// - Voice: Kore
    /// - History: `$HOME/.gemchat`
    /// - Color: enabled
    /// - Safety: block medium and above in every category
    pub fn new() -> Self {
        Self {
            mode: Mode::Fast,
            system_instruction: Some(DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            voice: DEFAULT_VOICE.to_string(),
            history_dir: Some(default_history_dir()),
            player: None,
            log_file: None,
            use_color: true,
            safety_settings: default_safety_settings(),
        }
    }

    /// Sets the starting mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: String) -> Self {
        self.system_instruction = Some(instruction);
        self
    }

    /// Sets the voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Sets the history directory; `None` disables persistence.
    pub fn with_history_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.history_dir = dir;
        self
    }

    /// Sets the player command.
    pub fn with_player(mut self, player: Option<String>) -> Self {
        self.player = player;
        self
    }

    /// Sets the log file.
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        let history_dir = if args.no_persist {
            None
        } else {
            args.history_dir.map(PathBuf::from).or(defaults.history_dir.clone())
        };
        ChatConfig {
            mode: if args.thinking { Mode::Thinking } else { Mode::Fast },
            system_instruction: args.system.or(defaults.system_instruction.clone()),
            voice: args.voice.unwrap_or_else(|| defaults.voice.clone()),
            history_dir,
            player: args.player.filter(|p| !p.trim().is_empty()),
            log_file: args.log_file.map(PathBuf::from),
            use_color: !args.no_color,
            ..defaults
        }
    }
}

fn default_history_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(HISTORY_DIR_NAME),
        None => PathBuf::from(HISTORY_DIR_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.mode, Mode::Fast);
        assert_eq!(config.voice, "Kore");
        assert!(config.use_color);
        assert!(config.player.is_none());
        assert!(config.log_file.is_none());
        assert_eq!(
            config.system_instruction.as_deref(),
            Some(DEFAULT_SYSTEM_INSTRUCTION)
        );
        assert!(config.history_dir.unwrap().ends_with(HISTORY_DIR_NAME));
        assert_eq!(config.safety_settings, default_safety_settings());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config.mode, Mode::Fast);
        assert!(config.use_color);
        assert!(config.history_dir.is_some());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            thinking: true,
            system: Some("Answer in French.".to_string()),
            voice: Some("Puck".to_string()),
            history_dir: Some("/tmp/chats".to_string()),
            no_persist: false,
            player: Some("aplay -q".to_string()),
            log_file: Some("traffic.jsonl".to_string()),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.mode, Mode::Thinking);
        assert_eq!(config.system_instruction.as_deref(), Some("Answer in French."));
        assert_eq!(config.voice, "Puck");
        assert_eq!(config.history_dir, Some(PathBuf::from("/tmp/chats")));
        assert_eq!(config.player.as_deref(), Some("aplay -q"));
        assert_eq!(config.log_file, Some(PathBuf::from("traffic.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn no_persist_wins() {
        let args = ChatArgs {
            history_dir: Some("/tmp/chats".to_string()),
            no_persist: true,
            ..ChatArgs::default()
        };
        assert!(ChatConfig::from(args).history_dir.is_none());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_mode(Mode::Thinking)
            .with_system_instruction("Be brief.".to_string())
            .with_voice("Charon")
            .with_history_dir(None)
            .with_player(Some("afplay".to_string()))
            .with_log_file(Some(PathBuf::from("log.jsonl")))
            .without_color();
        assert_eq!(config.mode, Mode::Thinking);
        assert_eq!(config.system_instruction.as_deref(), Some("Be brief."));
        assert_eq!(config.voice, "Charon");
        assert!(config.history_dir.is_none());
        assert_eq!(config.player.as_deref(), Some("afplay"));
        assert!(!config.use_color);
    }
}

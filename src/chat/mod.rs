//! Chat application module for interactive conversations with Gemini.
//!
//! This module provides the pieces of the `gemchat` REPL that sit on top of
//! [`ChatSession`](crate::ChatSession):
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use crate::session::{ChatSession, SessionStats};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};

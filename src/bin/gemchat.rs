//! Interactive chat application for conversing with Gemini.
//!
//! This binary provides a streaming REPL interface with speech playback.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! gemchat
//!
//! # Start with the thinking model and read replies with aplay
//! gemchat --thinking --player "aplay -q"
//!
//! # Keep nothing on disk and log API traffic
//! gemchat --no-persist --log-file traffic.jsonl
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Reset the conversation
//! - `/think on|off` - Switch models
//! - `/speak [n]` / `/stop [n]` - Control speech
//! - `/history` - List the conversation
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use gemchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use gemchat::voice::{self, Unsupported};
use gemchat::{
    AudioOutput, ClientLogger, CommandOutput, FileStorage, Gemini, GeminiBackend,
    GenerateContentRequest, GenerateContentResponse, MemoryStorage, MessageId, Mode, Model,
    NullOutput, PlaybackController, Role,
};

type Session = ChatSession<GeminiBackend>;
type Playback = PlaybackController<Box<dyn AudioOutput>>;

/// Appends one JSON object per API event to a file.
struct JsonLinesLogger {
    file: Mutex<File>,
}

impl JsonLinesLogger {
    fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write(&self, mut event: serde_json::Value) {
        let now = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        event["at"] = json!(now);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{event}");
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, model: &Model, request: &GenerateContentRequest) {
        self.write(json!({
            "event": "request",
            "model": model.to_string(),
            "request": request,
        }));
    }

    fn log_stream_chunk(&self, chunk: &GenerateContentResponse) {
        self.write(json!({
            "event": "chunk",
            "chunk": chunk,
        }));
    }

    fn log_speech(&self, text: &str, payload_len: usize) {
        self.write(json!({
            "event": "speech",
            "chars": text.chars().count(),
            "payload_len": payload_len,
        }));
    }
}

/// Main entry point for the gemchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("gemchat [OPTIONS]");
    let config = ChatConfig::from(args);

    let mut client = Gemini::new(None)?;
    if let Some(path) = &config.log_file {
        client = client.with_logger(Arc::new(JsonLinesLogger::open(path)?));
    }
    let backend = GeminiBackend::new(client).with_voice(config.voice.clone());
    let mut session = open_session(backend, &config)?;
    let mut playback = open_playback(&config)?;
    let mut recognizer = Unsupported;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;

    // The first Ctrl+C stops speech at the next prompt; a second one before
    // then exits, since a streaming reply cannot be cancelled.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        if interrupt_again(&interrupted_clone) {
            std::process::exit(130);
        }
    })?;

    println!(
        "Gemini Chat (mode: {}, model: {})",
        session.mode(),
        session.mode().model()
    );
    println!("Type /help for commands, /quit to exit\n");
    if let Some(err) = session.restore_error() {
        renderer.print_error(&format!("Could not restore the saved history: {err}"));
    }
    if let Some(last) = session.messages().last() {
        renderer.print_info(&format!(
            "{} message(s) in history; latest: {}",
            session.messages().len(),
            preview(&last.text)
        ));
    }

    loop {
        if interrupted.swap(false, Ordering::Relaxed) {
            playback.stop_all();
        }
        playback.poll_finished();

        let line = match rl.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - stop any speech
                playback.stop_all();
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let Some(command) = parse_command(line) else {
            send(&mut session, line, &mut renderer).await;
            continue;
        };
        match command {
            ChatCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ChatCommand::Clear => {
                playback.stop_all();
                match session.clear() {
                    Ok(_) => renderer.print_info("Conversation cleared."),
                    Err(err) => renderer.print_error(&format!("Failed to save history: {err}")),
                }
            }
            ChatCommand::Think(on) => {
                let mode = if on { Mode::Thinking } else { Mode::Fast };
                if session.set_mode(mode) {
                    renderer.print_info(&format!("Switched to {mode} mode ({}).", mode.model()));
                } else {
                    renderer.print_info(&format!("Already in {mode} mode."));
                }
            }
            ChatCommand::Speak(index) => match resolve(&session, index) {
                Some(id) => {
                    renderer.print_info("Synthesizing speech...");
                    if let Err(err) = session.speak(id, &mut playback).await {
                        renderer.print_error(&err.user_message());
                    }
                }
                None => renderer.print_error("No such message to speak."),
            },
            ChatCommand::Stop(None) => playback.stop_all(),
            ChatCommand::Stop(Some(index)) => match resolve(&session, Some(index)) {
                Some(id) => playback.stop(id),
                None => renderer.print_error("No such message."),
            },
            ChatCommand::Listen => match voice::listen(&mut recognizer) {
                Ok(text) => {
                    renderer.print_info(&format!("You said: {text}"));
                    send(&mut session, &text, &mut renderer).await;
                }
                Err(err) => renderer.print_error(&err.user_message()),
            },
            ChatCommand::History => print_history(&session, &playback),
            ChatCommand::Stats => print_stats(&session),
            ChatCommand::Help => {
                for line in help_text().lines() {
                    println!("    {line}");
                }
            }
            ChatCommand::Invalid(message) => renderer.print_error(&message),
        }
    }

    playback.stop_all();
    Ok(())
}

/// Records an interrupt; true when one was already pending.
fn interrupt_again(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::Relaxed)
}

fn open_session(backend: GeminiBackend, config: &ChatConfig) -> gemchat::Result<Session> {
    let session = match &config.history_dir {
        Some(dir) => ChatSession::new(backend, FileStorage::new(dir))?,
        None => ChatSession::new(backend, MemoryStorage::new())?,
    };
    Ok(session
        .with_mode(config.mode)
        .with_system_instruction(config.system_instruction.clone())
        .with_safety_settings(config.safety_settings.clone()))
}

fn open_playback(config: &ChatConfig) -> gemchat::Result<Playback> {
    let output: Box<dyn AudioOutput> = match &config.player {
        Some(command) => {
            let scratch = std::env::temp_dir().join("gemchat");
            Box::new(CommandOutput::from_command_line(command, scratch)?)
        }
        None => Box::new(NullOutput::new()),
    };
    Ok(PlaybackController::new(output))
}

async fn send(session: &mut Session, prompt: &str, renderer: &mut PlainTextRenderer) {
    if let Err(err) = session.send(prompt, renderer).await {
        renderer.print_error(&err.to_string());
    }
}

/// Maps a 1-based message number to an id; `None` means the latest reply.
fn resolve(session: &Session, index: Option<usize>) -> Option<MessageId> {
    match index {
        Some(n) => session.messages().get(n.checked_sub(1)?).map(|m| m.id),
        None => session.last_reply().map(|m| m.id),
    }
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut short: String = line.chars().take(60).collect();
    if short.len() < text.len() {
        short.push_str("...");
    }
    short
}

fn print_history(session: &Session, playback: &Playback) {
    for (index, message) in session.messages().iter().enumerate() {
        let speaker = match (message.role, message.greeting) {
            (Role::User, _) => "you",
            (Role::Model, true) => "system",
            (Role::Model, false) => "gemini",
        };
        let marker = if message.is_error { " [error]" } else { "" };
        let state = match playback.state(message.id) {
            gemchat::PlaybackState::Idle => "",
            gemchat::PlaybackState::Loading => " [loading audio]",
            gemchat::PlaybackState::Playing => " [playing]",
        };
        println!(
            "    {:>3}. {speaker}{marker}{state}: {}",
            index + 1,
            preview(&message.text)
        );
    }
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Mode: {}", stats.mode);
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Your turns: {}", stats.user_turns);
    println!("      Replies: {}", stats.replies);
    println!("      Errors: {}", stats.errors);
    if let Some(instruction) = session.system_instruction() {
        println!("      System instruction: {instruction}");
    } else {
        println!("      System instruction: (none)");
    }
    if stats.has_session {
        println!("      Chat session: live ({} turns)", stats.session_turns);
    } else {
        println!("      Chat session: (created on next message)");
    }
}

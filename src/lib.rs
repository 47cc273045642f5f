//! A streaming chat client for the Gemini API with speech playback.
//!
//! [`ChatSession`] keeps the displayed conversation, streams replies from a
//! [`ChatBackend`] into it and persists it through a [`HistoryStorage`].
//! [`Gemini`] is the HTTP client behind the default backend.

// Public modules
pub mod audio;
pub mod backend;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod fragment_stream;
pub mod history;
pub mod observability;
pub mod playback;
pub mod render;
pub mod session;
pub mod sse;
pub mod storage;
pub mod store;
pub mod types;
pub mod utils;
pub mod voice;

// Re-exports
pub use audio::{AudioBuffer, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE, decode_pcm16, decode_speech};
pub use backend::{ChatBackend, ChatRequest, GeminiBackend};
pub use client::{DEFAULT_VOICE, Gemini};
pub use client_logger::ClientLogger;
pub use error::{Error, ErrorKind, Result};
pub use fragment_stream::FragmentStream;
pub use history::format_history;
pub use observability::register_biometrics;
pub use playback::{
    AudioOutput, CommandOutput, NullOutput, OutputEvent, PlaybackController, PlaybackState,
};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatHandle, ChatSession, SessionStats};
pub use storage::{FileStorage, HISTORY_KEY, HistoryStorage, MemoryStorage};
pub use store::MessageStore;
pub use types::*;
pub use voice::{SpeechRecognizer, Unsupported, ensure_supported};

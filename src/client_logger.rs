//! Logging trait for Gemini client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`Gemini`](crate::Gemini)
//! client.

use crate::{GenerateContentRequest, GenerateContentResponse, Model};

/// A trait for logging Gemini client operations.
///
/// Implement this trait to capture and record all API interactions,
/// including each streamed chunk and each speech synthesis call.
///
/// # Example
///
/// ```rust,ignore
/// use gemchat::{ClientLogger, GenerateContentRequest, GenerateContentResponse, Model};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, model: &Model, request: &GenerateContentRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{model}: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &GenerateContentResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
///
///     fn log_speech(&self, text: &str, payload_len: usize) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "speech: {} chars -> {payload_len} bytes", text.len()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log an outgoing request before it is sent.
    fn log_request(&self, model: &Model, request: &GenerateContentRequest);

    /// Log one chunk of a streaming response.
    ///
    /// Called once per decoded chunk, in arrival order, before the chunk is
    /// turned into text fragments.
    fn log_stream_chunk(&self, chunk: &GenerateContentResponse);

    /// Log a completed speech synthesis call.
    ///
    /// `payload_len` is the length of the base64 audio payload.
    fn log_speech(&self, text: &str, payload_len: usize);
}

//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module handles parsing of the `alt=sse` stream returned by
//! `streamGenerateContent`, converting raw byte streams into
//! `GenerateContentResponse` chunks.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::STREAM_BYTES;
use crate::{Error, GenerateContentResponse, Result};

/// Error body the API may send in place of a chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub(crate) error: ApiErrorDetail,
}

/// The `error` object of an API error body.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub(crate) code: Option<u16>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

impl ApiErrorDetail {
    pub(crate) fn into_error(self, fallback_status: u16, retry_after: Option<u64>) -> Error {
        let status_code = self.code.unwrap_or(fallback_status);
        let message = match (self.status, self.message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => "no error details".to_string(),
        };
        Error::from_status(status_code, message, retry_after)
    }
}

/// Process a stream of bytes into a stream of response chunks.
///
/// Chunks may be split across reads; partial events are buffered until the
/// blank line that terminates them arrives.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin + Send + 'static,
    E: Into<Error> + 'static,
{
    let stream = byte_stream.map(|result| result.map_err(Into::<Error>::into));
    let buffer = String::new();
    // Bytes of a UTF-8 sequence cut off at the end of the previous read.
    let pending: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, pending),
        move |(mut stream, mut buffer, mut pending)| async move {
            loop {
                if let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    match event {
                        Some(event) => return Some((event, (stream, buffer, pending))),
                        None => continue,
                    }
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend_from_slice(&bytes);
                        match std::str::from_utf8(&pending) {
                            Ok(text) => {
                                buffer.push_str(text);
                                pending.clear();
                            }
                            Err(e) if e.error_len().is_none() => {
                                let valid = e.valid_up_to();
                                buffer.push_str(
                                    std::str::from_utf8(&pending[..valid]).unwrap_or_default(),
                                );
                                pending.drain(..valid);
                            }
                            Err(e) => {
                                pending.clear();
                                return Some((
                                    Err(Error::encoding(
                                        format!("Invalid UTF-8 in stream: {e}"),
                                        Some(Box::new(e)),
                                    )),
                                    (stream, buffer, pending),
                                ));
                            }
                        }
                        if buffer.contains('\r') {
                            buffer = buffer.replace("\r\n", "\n");
                        }
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, pending)));
                    }
                    None => {
                        // A final event may arrive without its trailing blank line.
                        if !buffer.trim().is_empty() {
                            let tail = std::mem::take(&mut buffer);
                            if let Some(event) = parse_event(&tail) {
                                return Some((event, (stream, buffer, pending)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract a complete SSE event from a buffer string.
///
/// Returns `None` when no complete event is buffered, and `Some((None, rest))`
/// for events that carry no data (comments, keep-alives).
fn extract_event(buffer: &str) -> Option<(Option<Result<GenerateContentResponse>>, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    Some((parse_event(event_text), rest.to_string()))
}

/// Parse the `data:` lines of one event.
fn parse_event(event_text: &str) -> Option<Result<GenerateContentResponse>> {
    let data: Vec<&str> = event_text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .collect();
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    if data == "[DONE]" {
        return None;
    }
    Some(parse_chunk(&data))
}

fn parse_chunk(data: &str) -> Result<GenerateContentResponse> {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(data) {
        return Err(envelope.error.into_error(500, None));
    }
    serde_json::from_str::<GenerateContentResponse>(data).map_err(|e| {
        Error::serialization(
            format!("Failed to parse stream chunk: {e}"),
            Some(Box::new(e)),
        )
    })
}

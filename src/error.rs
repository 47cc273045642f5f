//! Error types for gemchat.
//!
//! Every failure the chat can surface is classified into one of the
//! [`ErrorKind`] buckets so the session can attach a legible message to the
//! turn that failed instead of propagating the error further.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The coarse classification shown to the user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The API rejected the request as malformed.
    BadRequest,
    /// The credential was missing, invalid, or lacks permission.
    Authentication,
    /// Too many requests.
    RateLimit,
    /// The service is overloaded or down.
    ServiceUnavailable,
    /// The reply was withheld by the content filter.
    SafetyBlocked,
    /// Transport failure or anything unclassified.
    Unknown,
    /// A speech payload could not be decoded.
    AudioDecode,
    /// The speech synthesis call failed.
    SpeechSynthesis,
    /// The host has no speech recognition.
    SpeechRecognitionUnsupported,
}

/// The main error type for gemchat.
#[derive(Clone, Debug)]
pub enum Error {
    /// Bad request due to invalid parameters.
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// Authentication or permission error.
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Rate limit exceeded.
    RateLimit {
        /// Human-readable error message.
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// Server is overloaded or unavailable.
    ServiceUnavailable {
        /// Human-readable error message.
        message: String,
        /// HTTP status code reported by the server.
        status_code: u16,
    },

    /// The prompt or the reply was blocked by the content filter.
    SafetyBlocked {
        /// Human-readable error message.
        message: String,
        /// The reason reported by the API, e.g. `SAFETY`.
        reason: Option<String>,
    },

    /// Transport failure or an unmapped API status.
    Unknown {
        /// Human-readable error message.
        message: String,
        /// HTTP status code, when the failure came from a response.
        status_code: Option<u16>,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A base64 PCM payload was malformed.
    AudioDecode {
        /// Human-readable error message.
        message: String,
    },

    /// Speech synthesis failed or returned no audio.
    SpeechSynthesis {
        /// Human-readable error message.
        message: String,
    },

    /// Speech recognition is not available on this host.
    SpeechRecognitionUnsupported,

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Encoding/decoding error in a byte stream.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Caller supplied something the operation cannot act on.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },
}

impl Error {
    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable(message: impl Into<String>, status_code: u16) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new safety-blocked error.
    pub fn safety_blocked(message: impl Into<String>, reason: Option<String>) -> Self {
        Error::SafetyBlocked {
            message: message.into(),
            reason,
        }
    }

    /// Creates a new unknown error.
    pub fn unknown(
        message: impl Into<String>,
        status_code: Option<u16>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Unknown {
            message: message.into(),
            status_code,
            source: source.map(Arc::from),
        }
    }

    /// Creates a new audio decode error.
    pub fn audio_decode(message: impl Into<String>) -> Self {
        Error::AudioDecode {
            message: message.into(),
        }
    }

    /// Creates a new speech synthesis error.
    pub fn speech_synthesis(message: impl Into<String>) -> Self {
        Error::SpeechSynthesis {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Maps an HTTP status from the API onto the error taxonomy.
    pub fn from_status(status_code: u16, message: String, retry_after: Option<u64>) -> Self {
        match status_code {
            400 => Error::bad_request(message),
            401 | 403 => Error::authentication(message),
            429 => Error::rate_limit(message, retry_after),
            500 | 502..=504 => Error::service_unavailable(message, status_code),
            _ => Error::unknown(message, Some(status_code), None),
        }
    }

    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadRequest { .. } => ErrorKind::BadRequest,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            Error::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Error::SafetyBlocked { .. } => ErrorKind::SafetyBlocked,
            Error::AudioDecode { .. } => ErrorKind::AudioDecode,
            Error::SpeechSynthesis { .. } => ErrorKind::SpeechSynthesis,
            Error::SpeechRecognitionUnsupported => ErrorKind::SpeechRecognitionUnsupported,
            Error::Unknown { .. }
            | Error::Serialization { .. }
            | Error::Io { .. }
            | Error::Encoding { .. }
            | Error::Url { .. }
            | Error::Validation { .. } => ErrorKind::Unknown,
        }
    }

    /// The text placed on a failed turn or shown in a notification.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::BadRequest => {
                "The request was rejected as invalid. Try rephrasing your message.".to_string()
            }
            ErrorKind::Authentication => {
                "The API key was rejected. Check GEMINI_API_KEY and try again.".to_string()
            }
            ErrorKind::RateLimit => match self {
                Error::RateLimit {
                    retry_after: Some(secs),
                    ..
                } => format!("Too many requests. Wait {secs} seconds and try again."),
                _ => "Too many requests. Wait a moment and try again.".to_string(),
            },
            ErrorKind::ServiceUnavailable => {
                "The service is temporarily unavailable. Try again later.".to_string()
            }
            ErrorKind::SafetyBlocked => {
                "The response was blocked by the content filter.".to_string()
            }
            ErrorKind::AudioDecode => "The speech audio could not be decoded.".to_string(),
            ErrorKind::SpeechSynthesis => "Speech could not be generated.".to_string(),
            ErrorKind::SpeechRecognitionUnsupported => {
                "Voice input is not supported in this environment.".to_string()
            }
            ErrorKind::Unknown => match self {
                Error::Unknown { message, .. } => message.clone(),
                _ => format!("Something went wrong: {self}"),
            },
        }
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is related to rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// Returns true if this error is a bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// Returns true if the content filter withheld the reply.
    pub fn is_safety_blocked(&self) -> bool {
        matches!(self, Error::SafetyBlocked { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::BadRequest { .. } => Some(400),
            Error::RateLimit { .. } => Some(429),
            Error::ServiceUnavailable { status_code, .. } => Some(*status_code),
            Error::Unknown { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadRequest { message } => write!(f, "Bad request: {message}"),
            Error::Authentication { message } => write!(f, "Authentication error: {message}"),
            Error::RateLimit {
                message,
                retry_after,
            } => {
                if let Some(retry_after) = retry_after {
                    write!(
                        f,
                        "Rate limit exceeded: {message} (retry after {retry_after} seconds)"
                    )
                } else {
                    write!(f, "Rate limit exceeded: {message}")
                }
            }
            Error::ServiceUnavailable {
                message,
                status_code,
            } => write!(f, "Service unavailable ({status_code}): {message}"),
            Error::SafetyBlocked { message, reason } => {
                if let Some(reason) = reason {
                    write!(f, "Blocked by safety filter ({reason}): {message}")
                } else {
                    write!(f, "Blocked by safety filter: {message}")
                }
            }
            Error::Unknown {
                message,
                status_code,
                ..
            } => {
                if let Some(status_code) = status_code {
                    write!(f, "Unknown error ({status_code}): {message}")
                } else {
                    write!(f, "Unknown error: {message}")
                }
            }
            Error::AudioDecode { message } => write!(f, "Audio decode error: {message}"),
            Error::SpeechSynthesis { message } => write!(f, "Speech synthesis error: {message}"),
            Error::SpeechRecognitionUnsupported => {
                write!(f, "Speech recognition is not supported")
            }
            Error::Serialization { message, .. } => write!(f, "Serialization error: {message}"),
            Error::Io { message, .. } => write!(f, "I/O error: {message}"),
            Error::Encoding { message, .. } => write!(f, "Encoding error: {message}"),
            Error::Url { message, .. } => write!(f, "URL error: {message}"),
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Unknown { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::audio_decode(format!("invalid base64: {err}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        Error::unknown(format!("Request failed: {err}"), status_code, Some(Box::new(err)))
    }
}

/// A specialized Result type for gemchat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            Error::from_status(400, "bad".into(), None).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            Error::from_status(401, "no".into(), None).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            Error::from_status(403, "no".into(), None).kind(),
            ErrorKind::Authentication
        );
        assert_eq!(
            Error::from_status(429, "slow".into(), Some(7)).kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            Error::from_status(503, "down".into(), None).kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            Error::from_status(500, "oops".into(), None).kind(),
            ErrorKind::ServiceUnavailable
        );
        assert_eq!(
            Error::from_status(418, "teapot".into(), None).kind(),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn plumbing_errors_are_unknown() {
        let err = Error::validation("nope", None);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        let err: Error = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn base64_errors_are_audio_decode() {
        use base64::Engine;
        let err: Error = base64::engine::general_purpose::STANDARD
            .decode("!!!")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::AudioDecode);
    }

    #[test]
    fn user_messages() {
        let err = Error::rate_limit("slow down", Some(30));
        assert_eq!(
            err.user_message(),
            "Too many requests. Wait 30 seconds and try again."
        );
        let err = Error::safety_blocked("withheld", Some("SAFETY".to_string()));
        assert!(err.user_message().contains("content filter"));
        assert!(err.to_string().contains("SAFETY"));
        let err = Error::unknown("socket closed", None, None);
        assert_eq!(err.user_message(), "socket closed");
        let err = Error::validation("no chat handle", None);
        assert!(err.user_message().starts_with("Something went wrong: "));
    }

    #[test]
    fn status_codes() {
        assert_eq!(Error::bad_request("x").status_code(), Some(400));
        assert_eq!(Error::service_unavailable("x", 503).status_code(), Some(503));
        assert_eq!(Error::authentication("x").status_code(), None);
    }
}

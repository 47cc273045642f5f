use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, SPEECH_ERRORS,
    SPEECH_REQUESTS,
};
use crate::sse::{ApiErrorEnvelope, process_sse};
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, KnownModel, Model,
};
use crate::ClientLogger;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default voice for speech synthesis.
pub const DEFAULT_VOICE: &str = "Kore";

/// Client for the Gemini API.
///
/// Streaming requests have no overall timeout; only connection setup is
/// bounded.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    connect_timeout: Duration,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("base_url", &self.base_url.as_str())
            .field("connect_timeout", &self.connect_timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the `GEMINI_API_KEY`
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key {
            Some(key) => key,
            None => env::var(API_KEY_ENV).map_err(|_| {
                Error::authentication(format!(
                    "API key not provided and {API_KEY_ENV} environment variable not set"
                ))
            })?,
        };
        if HeaderValue::from_str(&api_key).is_err() {
            return Err(Error::authentication(
                "API key contains characters not allowed in a header",
            ));
        }

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let connect_timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::unknown(
                    format!("Failed to build HTTP client: {e}"),
                    None,
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            connect_timeout,
            logger: None,
        })
    }

    /// Attaches a logger that sees every request, chunk and speech call.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The logger attached to this client, if any.
    pub fn logger(&self) -> Option<Arc<dyn ClientLogger>> {
        self.logger.clone()
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::authentication("API key is not a valid header value"))?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// Builds `models/{model}:{method}` against the base URL.
    fn endpoint(&self, model: &Model, method: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("models/{model}:{method}"))?;
        if method == "streamGenerateContent" {
            url.set_query(Some("alt=sse"));
        }
        Ok(url)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::unknown(
                    format!("Failed to read error response: {e}"),
                    Some(status_code),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ApiErrorEnvelope>(&error_body) {
            // The HTTP status wins over the body's code.
            Ok(envelope) => {
                let mut detail = envelope.error;
                detail.code = Some(status_code);
                detail.into_error(status_code, retry_after)
            }
            Err(_) => Error::from_status(status_code, error_body, retry_after),
        }
    }

    fn map_send_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::unknown(format!("Request timed out: {e}"), None, Some(Box::new(e)))
        } else if e.is_connect() {
            Error::unknown(format!("Connection error: {e}"), None, Some(Box::new(e)))
        } else {
            Error::unknown(format!("Request failed: {e}"), None, Some(Box::new(e)))
        }
    }

    async fn post(&self, url: Url, headers: HeaderMap, request: &GenerateContentRequest) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(Self::map_send_error);
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(err);
            }
        };
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Send a request and get a non-streaming response.
    pub async fn generate(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        if let Some(logger) = &self.logger {
            logger.log_request(model, request);
        }
        let url = self.endpoint(model, "generateContent")?;
        let response = self.post(url, self.default_headers()?, request).await?;
        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
            })
    }

    /// Send a request and get a streaming response.
    ///
    /// Returns a stream of response chunks that can be processed incrementally.
    pub async fn stream_generate(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<impl Stream<Item = Result<GenerateContentResponse>> + Send + 'static> {
        if let Some(logger) = &self.logger {
            logger.log_request(model, request);
        }
        let url = self.endpoint(model, "streamGenerateContent")?;

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self.post(url, headers, request).await?;
        Ok(process_sse(response.bytes_stream()))
    }

    /// Synthesize speech for `text` and return the base64 PCM payload.
    ///
    /// The payload is 16-bit little-endian mono PCM at 24 kHz.
    pub async fn generate_speech(&self, text: &str, voice: &str) -> Result<String> {
        SPEECH_REQUESTS.click();
        let model = Model::Known(KnownModel::Gemini25FlashPreviewTts);
        let request = GenerateContentRequest::new(vec![Content::user(text)])
            .with_generation_config(GenerationConfig::speech(voice));
        let response = match self.generate(&model, &request).await {
            Ok(response) => response,
            Err(err) => {
                SPEECH_ERRORS.click();
                return Err(Error::speech_synthesis(err.to_string()));
            }
        };
        let payload = response
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.inline_data.as_ref())
            .map(|inline| inline.data.clone());
        match payload {
            Some(payload) if !payload.is_empty() => {
                if let Some(logger) = &self.logger {
                    logger.log_speech(text, payload.len());
                }
                Ok(payload)
            }
            _ => {
                SPEECH_ERRORS.click();
                Err(Error::speech_synthesis("response contained no audio"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.base_url.as_str(), DEFAULT_API_URL);
        assert_eq!(client.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        let client = Gemini::with_options(
            Some("test-key".to_string()),
            Some("https://proxy.example.com/v1beta".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://proxy.example.com/v1beta/");
        assert_eq!(client.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = Gemini::with_options(Some("k".to_string()), Some("not a url".to_string()), None)
            .unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn rejects_unprintable_key() {
        let err = Gemini::new(Some("bad\nkey".to_string())).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn endpoints() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        let model = Model::Known(KnownModel::Gemini25Flash);
        assert_eq!(
            client
                .endpoint(&model, "streamGenerateContent")
                .unwrap()
                .as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
        assert_eq!(
            client.endpoint(&model, "generateContent").unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn headers_carry_key() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers.get("x-goog-api-key").unwrap(), "test-key");
    }
}

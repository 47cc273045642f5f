//! The two calls the chat makes against the generative API.

use crate::fragment_stream::FragmentStream;
use crate::{
    Content, Gemini, GenerateContentRequest, GenerationConfig, Model, Result, SafetySetting,
};
use crate::client::DEFAULT_VOICE;

/// Everything needed to request one streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// The model variant to ask.
    pub model: Model,
    /// Standing instruction for the model.
    pub system_instruction: Option<String>,
    /// Per-category blocking thresholds.
    pub safety_settings: Vec<SafetySetting>,
    /// Generation options, e.g. the thinking budget.
    pub generation_config: GenerationConfig,
    /// Prior turns, oldest first.
    pub history: Vec<Content>,
    /// The new user utterance.
    pub prompt: String,
}

impl ChatRequest {
    /// The wire request: history followed by the prompt.
    pub fn to_request(&self) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(Content::user(self.prompt.clone()));
        GenerateContentRequest::new(contents)
            .with_system_instruction(self.system_instruction.clone())
            .with_safety_settings(self.safety_settings.clone())
            .with_generation_config(self.generation_config.clone())
    }
}

/// The external collaborator behind the chat.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a streamed reply for `request`.
    async fn stream_reply(&self, request: &ChatRequest) -> Result<FragmentStream>;

    /// Synthesize speech for `text`, returning base64 16-bit PCM.
    async fn synthesize_speech(&self, text: &str) -> Result<String>;
}

/// A [`Gemini`] client bound to a voice.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Gemini,
    voice: String,
}

impl GeminiBackend {
    /// Wraps a client using the default voice.
    pub fn new(client: Gemini) -> Self {
        Self {
            client,
            voice: DEFAULT_VOICE.to_string(),
        }
    }

    /// Sets the voice used for speech.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// The voice used for speech.
    pub fn voice(&self) -> &str {
        &self.voice
    }
}

#[async_trait::async_trait]
impl ChatBackend for GeminiBackend {
    async fn stream_reply(&self, request: &ChatRequest) -> Result<FragmentStream> {
        let chunks = self
            .client
            .stream_generate(&request.model, &request.to_request())
            .await?;
        Ok(FragmentStream::new(chunks).with_logger(self.client.logger()))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<String> {
        self.client.generate_speech(text, &self.voice).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KnownModel, Role, default_safety_settings};

    #[test]
    fn request_appends_prompt_after_history() {
        let request = ChatRequest {
            model: Model::Known(KnownModel::Gemini25Flash),
            system_instruction: Some("Be brief.".to_string()),
            safety_settings: default_safety_settings(),
            generation_config: GenerationConfig::default(),
            history: vec![Content::user("Hi"), Content::model("Hello!")],
            prompt: "How are you?".to_string(),
        };
        let wire = request.to_request();
        assert_eq!(wire.contents.len(), 3);
        assert_eq!(wire.contents[2].role, Some(Role::User));
        assert_eq!(wire.contents[2].joined_text(), "How are you?");
        assert!(wire.generation_config.is_none());
        assert_eq!(wire.safety_settings.len(), 4);
    }

    #[test]
    fn backend_voice() {
        let client = Gemini::new(Some("k".to_string())).unwrap();
        let backend = GeminiBackend::new(client);
        assert_eq!(backend.voice(), DEFAULT_VOICE);
        let backend = backend.with_voice("Puck");
        assert_eq!(backend.voice(), "Puck");
    }
}

// Wire types for the Gemini API and the chat's own data model.
pub mod content;
pub mod generate_request;
pub mod generate_response;
pub mod generation_config;
pub mod message;
pub mod model;
pub mod role;
pub mod safety;

pub use content::{Content, InlineData, Part};
pub use generate_request::GenerateContentRequest;
pub use generate_response::{
    Candidate, FinishReason, GenerateContentResponse, PromptFeedback, UsageMetadata,
};
pub use generation_config::{
    GenerationConfig, PrebuiltVoiceConfig, SpeechConfig, ThinkingConfig, VoiceConfig,
};
pub use message::{Message, MessageId};
pub use model::{KnownModel, Mode, Model};
pub use role::Role;
pub use safety::{
    HarmBlockThreshold, HarmCategory, SafetySetting, default_safety_settings,
    uniform_safety_settings,
};

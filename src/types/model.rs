use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a Gemini model identifier.
///
/// This can be a predefined model or a custom string value for models that
/// may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or private models)
    Custom(String),
}

/// Known Gemini models used by the chat.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Low-latency default model.
    #[serde(rename = "gemini-2.5-flash")]
    Gemini25Flash,

    /// Higher-latency reasoning model used in thinking mode.
    #[serde(rename = "gemini-2.5-pro")]
    Gemini25Pro,

    /// Text-to-speech model.
    #[serde(rename = "gemini-2.5-flash-preview-tts")]
    Gemini25FlashPreviewTts,
}

impl KnownModel {
    const ALL: [KnownModel; 3] = [
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25Pro,
        KnownModel::Gemini25FlashPreviewTts,
    ];

    /// The identifier used in request paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
            KnownModel::Gemini25FlashPreviewTts => "gemini-2.5-flash-preview-tts",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches("models/");
        Ok(KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == s)
            .map(|known| Model::Known(*known))
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

/// Which model variant answers the next request.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The fast, low-latency variant.
    #[default]
    Fast,

    /// The slower variant that spends a thinking budget before replying.
    Thinking,
}

impl Mode {
    /// Thinking budget in tokens spent by the thinking variant.
    pub const THINKING_BUDGET: i32 = 8192;

    /// The model that serves this mode.
    pub fn model(&self) -> Model {
        match self {
            Mode::Fast => Model::Known(KnownModel::Gemini25Flash),
            Mode::Thinking => Model::Known(KnownModel::Gemini25Pro),
        }
    }

    /// Returns true for [`Mode::Thinking`].
    pub fn is_thinking(&self) -> bool {
        matches!(self, Mode::Thinking)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Fast => write!(f, "fast"),
            Mode::Thinking => write!(f, "thinking"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let model = Model::Known(KnownModel::Gemini25Flash);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gemini-2.5-flash""#);
    }

    #[test]
    fn model_deserialization() {
        let model: Model = serde_json::from_str(r#""gemini-2.5-pro""#).unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gemini25Pro));

        let model: Model = serde_json::from_str(r#""gemini-exp-1206""#).unwrap();
        assert_eq!(model, Model::Custom("gemini-exp-1206".to_string()));
    }

    #[test]
    fn parse_strips_prefix() {
        let model: Model = "models/gemini-2.5-flash".parse().unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(Model::from("my-tuned-model").to_string(), "my-tuned-model");
    }

    #[test]
    fn mode_models() {
        assert_eq!(Mode::default(), Mode::Fast);
        assert_eq!(Mode::Fast.model().to_string(), "gemini-2.5-flash");
        assert_eq!(Mode::Thinking.model().to_string(), "gemini-2.5-pro");
        assert!(Mode::Thinking.is_thinking());
    }
}

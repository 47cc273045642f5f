use serde::{Deserialize, Serialize};

use crate::types::{Content, GenerationConfig, SafetySetting};

/// Body of a `generateContent` / `streamGenerateContent` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The conversation, oldest first, ending with the new prompt.
    pub contents: Vec<Content>,

    /// Standing instruction for the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Per-category blocking thresholds.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub safety_settings: Vec<SafetySetting>,

    /// Generation options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Create a request for the given contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Self::default()
        }
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: Option<String>) -> Self {
        self.system_instruction = instruction.map(Content::instruction);
        self
    }

    /// Sets the safety settings.
    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    /// Sets the generation config, dropping it when empty.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = if config.is_empty() {
            None
        } else {
            Some(config)
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_safety_settings;
    use serde_json::json;

    #[test]
    fn request_serialization() {
        let request = GenerateContentRequest::new(vec![Content::user("Hi")])
            .with_system_instruction(Some("Be kind.".to_string()))
            .with_generation_config(GenerationConfig::default());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "Hi"}]}],
                "systemInstruction": {"parts": [{"text": "Be kind."}]}
            })
        );
    }

    #[test]
    fn request_with_safety() {
        let request = GenerateContentRequest::new(vec![Content::user("Hi")])
            .with_safety_settings(default_safety_settings());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["safetySettings"].as_array().unwrap().len(), 4);
    }
}

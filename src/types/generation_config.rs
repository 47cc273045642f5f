use serde::{Deserialize, Serialize};

/// Generation options attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Thinking budget configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,

    /// Output modalities, e.g. `["AUDIO"]` for speech.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub response_modalities: Vec<String>,

    /// Voice selection for speech output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

/// How many tokens the model may spend thinking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Token budget; `0` disables thinking where the model allows it.
    pub thinking_budget: i32,
}

/// Speech output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// The voice to speak with.
    pub voice_config: VoiceConfig,
}

/// Voice wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// A named prebuilt voice.
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// A named prebuilt voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    /// Voice name, e.g. `Kore`.
    pub voice_name: String,
}

impl GenerationConfig {
    /// Config for a thinking request with the given budget.
    pub fn thinking(budget: i32) -> Self {
        Self {
            thinking_config: Some(ThinkingConfig {
                thinking_budget: budget,
            }),
            ..Self::default()
        }
    }

    /// Config for an audio-only response in the named voice.
    pub fn speech(voice_name: impl Into<String>) -> Self {
        Self {
            response_modalities: vec!["AUDIO".to_string()],
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice_name.into(),
                    },
                },
            }),
            ..Self::default()
        }
    }

    /// Returns true when nothing would be serialized.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn speech_config_serialization() {
        let config = GenerationConfig::speech("Kore");
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Kore"}}
                }
            })
        );
    }

    #[test]
    fn thinking_config_serialization() {
        let config = GenerationConfig::thinking(1024);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"thinkingConfig": {"thinkingBudget": 1024}})
        );
        assert!(GenerationConfig::default().is_empty());
        assert!(!config.is_empty());
    }
}

use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One turn of conversation as the API sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Author of the turn; absent for system instructions.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<Role>,

    /// The ordered parts of the turn.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A piece of a turn: text or inline binary data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,

    /// Inline data such as synthesized audio.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inline_data: Option<InlineData>,

    /// Set on parts that carry the model's thoughts rather than its answer.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thought: Option<bool>,
}

/// Base64-encoded binary payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type, e.g. `audio/L16;codec=pcm;rate=24000`.
    pub mime_type: String,

    /// Base64-encoded bytes.
    pub data: String,
}

impl Content {
    /// Create a turn with a single text part.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Create a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self::text(Role::Model, text)
    }

    /// Create a role-less content, used for system instructions.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenates the answer text of every part, skipping thoughts.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Returns true if the part is a thought summary.
    pub fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn user_content_serialization() {
        let content = Content::user("Hi");
        assert_eq!(
            to_value(&content).unwrap(),
            json!({"role": "user", "parts": [{"text": "Hi"}]})
        );
    }

    #[test]
    fn instruction_has_no_role() {
        let content = Content::instruction("Be brief.");
        assert_eq!(
            to_value(&content).unwrap(),
            json!({"parts": [{"text": "Be brief."}]})
        );
    }

    #[test]
    fn joined_text_skips_thoughts() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "pondering", "thought": true},
                {"text": "Hel"},
                {"text": "lo"}
            ]
        }))
        .unwrap();
        assert_eq!(content.joined_text(), "Hello");
    }

    #[test]
    fn inline_data_deserialization() {
        let part: Part = serde_json::from_value(json!({
            "inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAA="}
        }))
        .unwrap();
        let inline = part.inline_data.unwrap();
        assert_eq!(inline.data, "AAA=");
        assert!(inline.mime_type.starts_with("audio/L16"));
    }
}

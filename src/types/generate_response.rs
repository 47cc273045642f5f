use serde::{Deserialize, Serialize};

use crate::types::Content;

/// One response, or one chunk of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate replies; the chat only reads the first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Present when the prompt itself was rejected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Token accounting; usually only on the last chunk.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// A candidate reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content generated so far in this chunk.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<Content>,

    /// Why generation stopped, on the final chunk.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub finish_reason: Option<FinishReason>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop.
    Stop,
    /// Output token limit reached.
    MaxTokens,
    /// Flagged by the safety filter.
    Safety,
    /// Flagged for recitation.
    Recitation,
    /// Prohibited content.
    ProhibitedContent,
    /// Matched a blocklist term.
    Blocklist,
    /// Sensitive personally identifiable information.
    Spii,
    /// Anything else the API adds later.
    #[serde(other)]
    Other,
}

impl FinishReason {
    /// Returns true if the reason is a content-filter stop.
    pub fn is_safety(&self) -> bool {
        matches!(
            self,
            FinishReason::Safety
                | FinishReason::ProhibitedContent
                | FinishReason::Blocklist
                | FinishReason::Spii
        )
    }

    /// The wire name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "STOP",
            FinishReason::MaxTokens => "MAX_TOKENS",
            FinishReason::Safety => "SAFETY",
            FinishReason::Recitation => "RECITATION",
            FinishReason::ProhibitedContent => "PROHIBITED_CONTENT",
            FinishReason::Blocklist => "BLOCKLIST",
            FinishReason::Spii => "SPII",
            FinishReason::Other => "OTHER",
        }
    }
}

/// Feedback about the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Set when the prompt was blocked, e.g. `SAFETY`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_reason: Option<String>,
}

/// Token accounting.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Tokens in the reply.
    #[serde(default)]
    pub candidates_token_count: u32,
    /// Prompt plus reply.
    #[serde(default)]
    pub total_token_count: u32,
}

impl GenerateContentResponse {
    /// The answer text carried by the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(Content::joined_text)
            .unwrap_or_default()
    }

    /// The finish reason of the first candidate.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.candidates.first().and_then(|c| c.finish_reason.as_ref())
    }

    /// The block reason for the prompt, if blocked.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_deserialization() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hel"}]},
                "index": 0
            }],
            "modelVersion": "gemini-2.5-flash"
        }))
        .unwrap();
        assert_eq!(chunk.text(), "Hel");
        assert!(chunk.finish_reason().is_none());
    }

    #[test]
    fn unknown_finish_reason() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MALFORMED_FUNCTION_CALL"}]
        }))
        .unwrap();
        assert_eq!(chunk.finish_reason(), Some(&FinishReason::Other));
        assert_eq!(chunk.text(), "");
    }

    #[test]
    fn safety_reasons() {
        assert!(FinishReason::Safety.is_safety());
        assert!(FinishReason::Spii.is_safety());
        assert!(!FinishReason::Stop.is_safety());
        assert!(!FinishReason::MaxTokens.is_safety());
    }

    #[test]
    fn blocked_prompt() {
        let chunk: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert_eq!(chunk.block_reason(), Some("SAFETY"));
    }
}

use serde::{Deserialize, Serialize};

/// Harm categories that accept a blocking threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    /// Harassment.
    HarmCategoryHarassment,
    /// Hate speech.
    HarmCategoryHateSpeech,
    /// Sexually explicit content.
    HarmCategorySexuallyExplicit,
    /// Dangerous content.
    HarmCategoryDangerousContent,
}

/// Probability threshold at which content is blocked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    /// Block when probability is low, medium or high.
    BlockLowAndAbove,
    /// Block when probability is medium or high.
    BlockMediumAndAbove,
    /// Block only when probability is high.
    BlockOnlyHigh,
}

/// One category/threshold pair sent with a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    /// The category being configured.
    pub category: HarmCategory,
    /// The threshold applied to it.
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    /// Create a new safety setting.
    pub fn new(category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        Self {
            category,
            threshold,
        }
    }
}

/// The same threshold applied to every category.
pub fn uniform_safety_settings(threshold: HarmBlockThreshold) -> Vec<SafetySetting> {
    [
        HarmCategory::HarmCategoryHarassment,
        HarmCategory::HarmCategoryHateSpeech,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryDangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting::new(category, threshold))
    .collect()
}

/// Medium-and-above blocking in every category.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    uniform_safety_settings(HarmBlockThreshold::BlockMediumAndAbove)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn safety_setting_serialization() {
        let setting = SafetySetting::new(
            HarmCategory::HarmCategoryHateSpeech,
            HarmBlockThreshold::BlockOnlyHigh,
        );
        assert_eq!(
            serde_json::to_value(setting).unwrap(),
            json!({"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_ONLY_HIGH"})
        );
    }

    #[test]
    fn defaults_cover_every_category() {
        let settings = default_safety_settings();
        assert_eq!(settings.len(), 4);
        assert!(
            settings
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockMediumAndAbove)
        );
    }
}

// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based emotion classification of a single utterance.
//!
//! Uses the language model as a classifier with a fixed prompt demanding a
//! JSON object, validated strictly against the [`EmotionRecord`] schema.
//! Malformed output of any kind falls back to the documented default
//! record: emotion is advisory, and a guess must never block the primary
//! answer.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use kotoba_core::KotobaError;
use kotoba_core::traits::ProviderAdapter;
use kotoba_core::types::{
    EmotionRecord, PrimaryEmotion, ProviderMessage, ProviderRequest, Sentiment,
};

/// Classification prompt. The utterance replaces `{utterance}`.
const CLASSIFICATION_PROMPT: &str = r#"Classify the emotional content of this message. Output a single JSON object with exactly these fields:

- "primary_emotion": one of joy, sadness, anger, fear, surprise, disgust, neutral
- "intensity": integer from 1 (mild) to 5 (extreme)
- "sentiment": one of positive, negative, neutral
- "communication_style": short description of how the sender is communicating (e.g. "casual", "formal", "urgent")
- "response_tone": recommended tone for the reply (e.g. "empathetic", "factual", "reassuring")
- "explanation": one sentence explaining the classification

Message:
{utterance}

Output the JSON object only, no explanation outside it:"#;

/// Raw wire shape of a classification answer, before validation.
#[derive(Debug, serde::Deserialize)]
struct RawClassification {
    primary_emotion: String,
    intensity: i64,
    sentiment: String,
    communication_style: String,
    response_tone: String,
    explanation: String,
}

/// Classifies utterances into [`EmotionRecord`]s via the language model.
pub struct EmotionAnalyzer {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
}

impl EmotionAnalyzer {
    /// Creates an analyzer using `model` for classification calls.
    /// An empty model string selects the provider's default.
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: String) -> Self {
        Self { provider, model }
    }

    /// Classify one utterance.
    ///
    /// Never errors: provider failure or malformed output yields
    /// [`EmotionRecord::default`].
    pub async fn analyze(&self, utterance: &str) -> EmotionRecord {
        let prompt = CLASSIFICATION_PROMPT.replace("{utterance}", utterance);
        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: None,
            messages: vec![ProviderMessage::user(prompt)],
            max_tokens: 512,
        };

        let content = match self.provider.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "emotion classification call failed, using default record");
                return EmotionRecord::default();
            }
        };

        match parse_classification(&content) {
            Some(record) => record,
            None => {
                warn!("emotion classification output was malformed, using default record");
                debug!(raw = content.as_str(), "raw classification output");
                EmotionRecord::default()
            }
        }
    }
}

/// Parse and validate a classification answer.
///
/// Handles code-fence-wrapped and prose-wrapped JSON. Returns `None` on
/// parse failure, unknown enum values, or out-of-range intensity.
pub(crate) fn parse_classification(response: &str) -> Option<EmotionRecord> {
    let trimmed = response.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')? + 1;
    let json_str = &trimmed[start..end];

    let raw: RawClassification = serde_json::from_str(json_str).ok()?;

    let primary_emotion = PrimaryEmotion::from_str(&raw.primary_emotion.to_lowercase()).ok()?;
    let sentiment = Sentiment::from_str(&raw.sentiment.to_lowercase()).ok()?;
    if !(1..=5).contains(&raw.intensity) {
        return None;
    }

    Some(EmotionRecord {
        primary_emotion,
        intensity: raw.intensity as u8,
        sentiment,
        communication_style: raw.communication_style,
        response_tone: raw.response_tone,
        explanation: raw.explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kotoba_core::traits::PluginAdapter;
    use kotoba_core::types::{AdapterType, HealthStatus, ProviderResponse, TokenUsage};

    struct CannedProvider {
        response: Option<String>,
    }

    #[async_trait]
    impl PluginAdapter for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Provider
        }
        async fn health_check(&self) -> Result<HealthStatus, KotobaError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), KotobaError> {
            Ok(())
        }
    }

    #[async_trait]
    impl ProviderAdapter for CannedProvider {
        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, KotobaError> {
            match &self.response {
                Some(content) => Ok(ProviderResponse {
                    content: content.clone(),
                    usage: TokenUsage::default(),
                }),
                None => Err(KotobaError::Provider {
                    message: "provider down".to_string(),
                    source: None,
                }),
            }
        }
    }

    const VALID_JSON: &str = r#"{
        "primary_emotion": "anger",
        "intensity": 4,
        "sentiment": "negative",
        "communication_style": "urgent",
        "response_tone": "empathetic",
        "explanation": "Strong frustration about a delay."
    }"#;

    #[test]
    fn parses_valid_classification() {
        let record = parse_classification(VALID_JSON).unwrap();
        assert_eq!(record.primary_emotion, PrimaryEmotion::Anger);
        assert_eq!(record.intensity, 4);
        assert_eq!(record.sentiment, Sentiment::Negative);
        assert_eq!(record.communication_style, "urgent");
        assert_eq!(record.response_tone, "empathetic");
    }

    #[test]
    fn parses_code_fenced_json() {
        let fenced = format!("```json\n{VALID_JSON}\n```");
        let record = parse_classification(&fenced).unwrap();
        assert_eq!(record.primary_emotion, PrimaryEmotion::Anger);
    }

    #[test]
    fn parses_prose_wrapped_json() {
        let wrapped = format!("Here is the analysis:\n{VALID_JSON}\nHope that helps!");
        let record = parse_classification(&wrapped).unwrap();
        assert_eq!(record.sentiment, Sentiment::Negative);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_classification("the user seems angry").is_none());
    }

    #[test]
    fn rejects_unknown_emotion() {
        let json = r#"{"primary_emotion": "melancholy", "intensity": 3, "sentiment": "negative",
            "communication_style": "casual", "response_tone": "warm", "explanation": "x"}"#;
        assert!(parse_classification(json).is_none());
    }

    #[test]
    fn rejects_out_of_range_intensity() {
        let json = r#"{"primary_emotion": "joy", "intensity": 9, "sentiment": "positive",
            "communication_style": "casual", "response_tone": "warm", "explanation": "x"}"#;
        assert!(parse_classification(json).is_none());
        let json = r#"{"primary_emotion": "joy", "intensity": 0, "sentiment": "positive",
            "communication_style": "casual", "response_tone": "warm", "explanation": "x"}"#;
        assert!(parse_classification(json).is_none());
    }

    #[test]
    fn rejects_missing_fields() {
        let json = r#"{"primary_emotion": "joy", "intensity": 2}"#;
        assert!(parse_classification(json).is_none());
    }

    #[test]
    fn accepts_mixed_case_enum_values() {
        let json = r#"{"primary_emotion": "Anger", "intensity": 5, "sentiment": "Negative",
            "communication_style": "blunt", "response_tone": "calm", "explanation": "x"}"#;
        let record = parse_classification(json).unwrap();
        assert_eq!(record.primary_emotion, PrimaryEmotion::Anger);
    }

    #[tokio::test]
    async fn analyze_returns_parsed_record() {
        let analyzer = EmotionAnalyzer::new(
            Arc::new(CannedProvider {
                response: Some(VALID_JSON.to_string()),
            }),
            String::new(),
        );
        let record = analyzer.analyze("I am furious about this delay!").await;
        assert_eq!(record.primary_emotion, PrimaryEmotion::Anger);
        assert_eq!(record.sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn analyze_defaults_on_malformed_output() {
        let analyzer = EmotionAnalyzer::new(
            Arc::new(CannedProvider {
                response: Some("no json here".to_string()),
            }),
            String::new(),
        );
        let record = analyzer.analyze("whatever").await;
        assert_eq!(record, EmotionRecord::default());
    }

    #[tokio::test]
    async fn analyze_defaults_on_provider_failure() {
        let analyzer =
            EmotionAnalyzer::new(Arc::new(CannedProvider { response: None }), String::new());
        let record = analyzer.analyze("whatever").await;
        assert_eq!(record, EmotionRecord::default());
    }
}

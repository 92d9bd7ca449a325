// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Kotoba core.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Channel,
    Provider,
    Storage,
    Embedding,
}

// --- Conversation state types ---

/// The author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// A single message in a thread's history.
///
/// Histories are strictly append-only: a message is never edited or removed
/// except by an explicit thread reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: String,
    /// Thread this message belongs to.
    pub thread_id: String,
    /// Who authored the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// Bookkeeping record for one conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// Thread identifier (opaque string).
    pub id: String,
    /// Channel the thread originates from ("api", "ws", "discord", "cli").
    pub channel: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-activity timestamp.
    pub updated_at: String,
}

// --- Channel types ---

/// An inbound message received from a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Unique identifier for this inbound event.
    pub id: String,
    /// Thread to continue, if the channel knows one.
    pub thread_id: Option<String>,
    /// Channel name ("discord", "ws", "api").
    pub channel: String,
    /// Platform identifier of the sender.
    pub sender_id: String,
    /// Message text.
    pub content: String,
    /// URL of an attached file, if any (used for PDF ingestion).
    pub attachment_url: Option<String>,
    /// ISO 8601 receipt timestamp.
    pub timestamp: String,
    /// Optional channel-specific metadata as a JSON string.
    pub metadata: Option<String>,
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Thread the reply belongs to.
    pub thread_id: Option<String>,
    /// Destination within the channel (platform chat/channel id).
    pub channel: String,
    /// Reply text.
    pub content: String,
    /// Optional channel-specific metadata as a JSON string.
    pub metadata: Option<String>,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    /// Whether the channel supports a typing indicator.
    pub supports_typing: bool,
    /// Maximum message length accepted by the platform, if limited.
    pub max_message_length: Option<usize>,
}

/// Splits `content` into ordered segments of at most `limit` characters.
///
/// Segments are non-overlapping, preserve original character order, and
/// concatenate back to `content` exactly (no characters are dropped).
/// Splits prefer a newline or space boundary within the limit; the
/// separator stays at the end of the earlier segment so reassembly is exact.
pub fn split_message(content: &str, limit: usize) -> Vec<String> {
    if limit == 0 || content.chars().count() <= limit {
        return vec![content.to_string()];
    }

    let mut segments = Vec::new();
    let mut rest = content;

    while rest.chars().count() > limit {
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];

        // Prefer breaking just after a newline or space within the window.
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|pos| pos + 1)
            .filter(|&pos| pos > 0)
            .unwrap_or(hard_end);

        segments.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        segments.push(rest.to_string());
    }

    segments
}

// --- Provider types ---

/// A single message in the provider conversation format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ProviderMessage {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model identifier. Empty string means the adapter's default model.
    pub model: String,
    /// System prompt, if any.
    pub system_prompt: Option<String>,
    /// Conversation messages, oldest first.
    pub messages: Vec<ProviderMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// A normalized response from an LLM provider.
///
/// Every provider adapter reduces its wire format to this single shape so
/// callers never branch on response structure.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Concatenated text content of the response.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
}

/// Token usage statistics from a provider call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens consumed.
    pub input_tokens: u32,
    /// Number of output tokens generated.
    pub output_tokens: u32,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    /// Texts to embed; output order matches input order.
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One embedding per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Dimensionality of each embedding.
    pub dimensions: usize,
}

// --- Emotion types ---

/// Primary emotion categories recognized by the emotion analyzer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrimaryEmotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    #[default]
    Neutral,
}

/// Overall sentiment of an utterance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Structured emotion classification of a single utterance.
///
/// Advisory only: attached to replies, never persisted into message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    /// Dominant emotion category.
    pub primary_emotion: PrimaryEmotion,
    /// Intensity on a 1-5 scale.
    pub intensity: u8,
    /// Overall sentiment.
    pub sentiment: Sentiment,
    /// Observed communication style (e.g. "casual", "formal").
    pub communication_style: String,
    /// Recommended tone for the response.
    pub response_tone: String,
    /// Short justification for the classification.
    pub explanation: String,
}

impl Default for EmotionRecord {
    /// The documented fallback record used whenever classification fails.
    fn default() -> Self {
        Self {
            primary_emotion: PrimaryEmotion::Neutral,
            intensity: 3,
            sentiment: Sentiment::Neutral,
            communication_style: "casual".to_string(),
            response_tone: "factual".to_string(),
            explanation: "default analysis used".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrips_through_storage_strings() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::from_str_value("user"), Role::User);
        assert_eq!(Role::from_str_value("assistant"), Role::Assistant);
    }

    #[test]
    fn split_message_short_content_single_segment() {
        let segments = split_message("hello", 2000);
        assert_eq!(segments, vec!["hello".to_string()]);
    }

    #[test]
    fn split_message_exact_reassembly() {
        let content = "a".repeat(5000);
        let segments = split_message(&content, 2000);
        assert_eq!(segments.len(), 3);
        for s in &segments {
            assert!(s.chars().count() <= 2000);
        }
        assert_eq!(segments.concat(), content);
    }

    #[test]
    fn split_message_prefers_word_boundaries() {
        let content = format!("{} {}", "x".repeat(1500), "y".repeat(1000));
        let segments = split_message(&content, 2000);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], format!("{} ", "x".repeat(1500)));
        assert_eq!(segments.concat(), content);
    }

    #[test]
    fn split_message_handles_multibyte_characters() {
        let content = "é".repeat(4100);
        let segments = split_message(&content, 2000);
        for s in &segments {
            assert!(s.chars().count() <= 2000);
        }
        assert_eq!(segments.concat(), content);
    }

    #[test]
    fn emotion_record_default_matches_documented_fallback() {
        let record = EmotionRecord::default();
        assert_eq!(record.primary_emotion, PrimaryEmotion::Neutral);
        assert_eq!(record.intensity, 3);
        assert_eq!(record.sentiment, Sentiment::Neutral);
        assert_eq!(record.communication_style, "casual");
        assert_eq!(record.response_tone, "factual");
        assert_eq!(record.explanation, "default analysis used");
    }

    #[test]
    fn emotion_enums_deserialize_lowercase() {
        let e: PrimaryEmotion = serde_json::from_str("\"anger\"").unwrap();
        assert_eq!(e, PrimaryEmotion::Anger);
        let s: Sentiment = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(s, Sentiment::Negative);
    }

    #[test]
    fn provider_message_constructors() {
        let u = ProviderMessage::user("hi");
        assert_eq!(u.role, "user");
        assert_eq!(u.content, "hi");
        let a = ProviderMessage::assistant("hello");
        assert_eq!(a.role, "assistant");
    }
}

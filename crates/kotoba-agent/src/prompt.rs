// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for conversation turns.
//!
//! The system prompt is built from the configured persona, an optional
//! retrieved-context block, and an optional emotion-guidance block. History
//! and the new utterance travel as messages, not in the system prompt.

use kotoba_core::types::EmotionRecord;
use kotoba_knowledge::Passage;

/// Default persona used when none is configured.
pub const DEFAULT_PERSONA: &str = "You are Kotoba, a helpful assistant. Answer clearly and \
concisely. When context passages are provided, prefer them over prior knowledge and do not \
mention that you were given context.";

/// Compose the system prompt for one turn.
pub fn compose_system_prompt(
    persona: &str,
    passages: &[Passage],
    emotion: Option<&EmotionRecord>,
) -> String {
    let mut prompt = String::from(persona);

    if !passages.is_empty() {
        prompt.push_str("\n\nRelevant context from the knowledge base:\n");
        for passage in passages {
            prompt.push_str(&format!("\n[source: {}]\n{}\n", passage.source, passage.text));
        }
    }

    if let Some(record) = emotion {
        prompt.push_str(&format!(
            "\n\nThe user's message expresses {} (intensity {}/5, {} sentiment). \
             Respond in a {} tone.",
            record.primary_emotion, record.intensity, record.sentiment, record.response_tone
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotoba_core::types::{PrimaryEmotion, Sentiment};

    fn passage(text: &str, source: &str) -> Passage {
        Passage {
            text: text.to_string(),
            source: source.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn bare_persona_without_extras() {
        let prompt = compose_system_prompt("You are a bot.", &[], None);
        assert_eq!(prompt, "You are a bot.");
    }

    #[test]
    fn context_block_lists_passages_with_sources() {
        let passages = vec![
            passage("Paris is the capital of France.", "text"),
            passage("France is in Europe.", "https://example.com"),
        ];
        let prompt = compose_system_prompt("Persona.", &passages, None);
        assert!(prompt.contains("Relevant context"));
        assert!(prompt.contains("[source: text]"));
        assert!(prompt.contains("Paris is the capital of France."));
        assert!(prompt.contains("[source: https://example.com]"));
    }

    #[test]
    fn emotion_block_names_emotion_and_tone() {
        let record = EmotionRecord {
            primary_emotion: PrimaryEmotion::Anger,
            intensity: 4,
            sentiment: Sentiment::Negative,
            communication_style: "urgent".into(),
            response_tone: "empathetic".into(),
            explanation: "frustrated".into(),
        };
        let prompt = compose_system_prompt("Persona.", &[], Some(&record));
        assert!(prompt.contains("anger"));
        assert!(prompt.contains("4/5"));
        assert!(prompt.contains("negative sentiment"));
        assert!(prompt.contains("empathetic tone"));
    }

    #[test]
    fn passages_precede_emotion_guidance() {
        let record = EmotionRecord::default();
        let passages = vec![passage("Fact.", "text")];
        let prompt = compose_system_prompt("Persona.", &passages, Some(&record));
        let ctx_pos = prompt.find("Relevant context").unwrap();
        let emo_pos = prompt.find("The user's message expresses").unwrap();
        assert!(ctx_pos < emo_pos);
    }
}

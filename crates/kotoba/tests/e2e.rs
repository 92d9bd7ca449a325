// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over the assembled core: ingestion feeding retrieval,
//! retrieval feeding conversation, emotion analysis, and transport-side
//! reply splitting. External capabilities (model, embedding service) are
//! replaced by deterministic in-process adapters.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use kotoba_agent::{EmotionAnalyzer, Orchestrator, TurnRequest};
use kotoba_core::KotobaError;
use kotoba_core::traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
use kotoba_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, PrimaryEmotion, ProviderRequest,
    ProviderResponse, Role, Sentiment, TokenUsage, split_message,
};
use kotoba_knowledge::store::ChunkStore;
use kotoba_knowledge::{IngestOutcome, IngestPipeline, Retriever};
use kotoba_storage::Database;

/// Deterministic embedder: words shared with an indexed chunk pull the
/// query vector toward that chunk.
struct BagOfWordsEmbedder;

const VOCAB: [&str; 8] = [
    "paris", "capital", "france", "tokyo", "japan", "cheese", "delay", "weather",
];

fn encode(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    let mut v: Vec<f32> = VOCAB
        .iter()
        .map(|w| if lowered.contains(w) { 1.0 } else { 0.0 })
        .collect();
    if v.iter().all(|x| *x == 0.0) {
        v[VOCAB.len() - 1] = 0.1;
    }
    v
}

#[async_trait]
impl PluginAdapter for BagOfWordsEmbedder {
    fn name(&self) -> &str {
        "bag-of-words"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }
    async fn health_check(&self) -> Result<HealthStatus, KotobaError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), KotobaError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for BagOfWordsEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, KotobaError> {
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| encode(t)).collect(),
            dimensions: VOCAB.len(),
        })
    }
}

/// Provider that answers from the retrieved context when present,
/// otherwise admits it does not know. Scripted responses, when queued,
/// take precedence (used for emotion classification calls).
struct FakeModel {
    scripted: Mutex<VecDeque<String>>,
}

impl FakeModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            scripted: Mutex::new(VecDeque::new()),
        })
    }

    fn push_scripted(&self, response: &str) {
        self.scripted.lock().unwrap().push_back(response.to_string());
    }
}

#[async_trait]
impl PluginAdapter for FakeModel {
    fn name(&self) -> &str {
        "fake-model"
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
impl ProviderAdapter for FakeModel {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, KotobaError> {
        if let Some(scripted) = self.scripted.lock().unwrap().pop_front() {
            return Ok(ProviderResponse {
                content: scripted,
                usage: TokenUsage::default(),
            });
        }

        let system = request.system_prompt.unwrap_or_default();
        let content = if system.contains("Paris is the capital of France.") {
            "Paris is the capital of France.".to_string()
        } else {
            "I don't have that information.".to_string()
        };
        Ok(ProviderResponse {
            content,
            usage: TokenUsage::default(),
        })
    }
}

struct Core {
    orchestrator: Arc<Orchestrator>,
    ingest: Arc<IngestPipeline>,
    model: Arc<FakeModel>,
}

async fn build_core() -> Core {
    let db = Database::open_in_memory().await.unwrap();
    let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
    let store = Arc::new(ChunkStore::open(conn).await.unwrap());
    let embedder = Arc::new(BagOfWordsEmbedder);
    let model = FakeModel::new();

    let config = kotoba_config::model::KnowledgeConfig {
        chunk_size: 500,
        chunk_overlap: 25,
        top_k: 3,
    };
    let ingest = Arc::new(IngestPipeline::new(embedder.clone(), store.clone(), &config).unwrap());
    let retriever = Arc::new(Retriever::new(embedder, store, config.top_k));
    let emotion = Arc::new(EmotionAnalyzer::new(model.clone(), String::new()));

    let orchestrator = Arc::new(Orchestrator::new(
        db,
        model.clone(),
        Some(retriever),
        Some(emotion),
        None,
        String::new(),
        1024,
    ));

    Core {
        orchestrator,
        ingest,
        model,
    }
}

fn turn(thread_id: &str, utterance: &str) -> TurnRequest {
    TurnRequest {
        thread_id: thread_id.to_string(),
        channel: "api".to_string(),
        utterance: utterance.to_string(),
        want_emotion: false,
        want_retrieval: true,
    }
}

#[tokio::test]
async fn ingested_fact_is_retrieved_and_answered() {
    let core = build_core().await;

    let outcome = core
        .ingest
        .ingest_text("Paris is the capital of France.")
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::Written { chunks_written: 1 }));

    let reply = core
        .orchestrator
        .handle_turn(turn("t-e2e", "What is the capital of France?"))
        .await;

    assert!(reply.message.contains("Paris"), "got: {}", reply.message);
    assert!(reply.context_passages > 0, "expected retrieved context");
    assert!(reply.error.is_none());
}

#[tokio::test]
async fn emotion_aware_turn_detects_anger() {
    let core = build_core().await;
    // The classification call runs before the completion call.
    core.model.push_scripted(
        r#"{"primary_emotion": "anger", "intensity": 5, "sentiment": "negative",
            "communication_style": "blunt", "response_tone": "empathetic",
            "explanation": "Explicit fury about a delay."}"#,
    );
    core.model
        .push_scripted("I'm sorry about the delay. Let me help.");

    let mut request = turn("t-angry", "I am furious about this delay!");
    request.want_emotion = true;
    let reply = core.orchestrator.handle_turn(request).await;

    let record = reply.emotion.expect("emotion record should be attached");
    assert_eq!(record.primary_emotion, PrimaryEmotion::Anger);
    assert_eq!(record.sentiment, Sentiment::Negative);
    assert_eq!(reply.message, "I'm sorry about the delay. Let me help.");
}

#[tokio::test]
async fn reingestion_is_idempotent_end_to_end() {
    let core = build_core().await;

    let first = core
        .ingest
        .ingest_text("Tokyo is the capital of Japan.")
        .await
        .unwrap();
    let IngestOutcome::Written { chunks_written } = first else {
        panic!("expected Written");
    };

    core.ingest
        .ingest_text("Tokyo is the capital of Japan.")
        .await
        .unwrap();

    // Querying for the fact returns exactly one matching passage, not two.
    let reply = core
        .orchestrator
        .handle_turn(turn("t-dedup", "What is the capital of Japan?"))
        .await;
    assert_eq!(reply.context_passages, chunks_written);
}

#[tokio::test]
async fn history_accumulates_across_turns() {
    let core = build_core().await;

    core.orchestrator.handle_turn(turn("t-hist", "hello")).await;
    core.orchestrator.handle_turn(turn("t-hist", "and again")).await;

    let history = core.orchestrator.history("t-hist").await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[2].role, Role::User);
    assert_eq!(history[3].role, Role::Assistant);
}

#[test]
fn five_thousand_chars_split_for_a_two_thousand_char_transport() {
    let reply = "a".repeat(5000);
    let segments = split_message(&reply, 2000);

    assert_eq!(segments.len(), 3);
    for segment in &segments {
        assert!(segment.chars().count() <= 2000);
    }
    assert_eq!(segments.concat(), reply);
}

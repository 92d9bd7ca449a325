// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component construction shared by the CLI subcommands.
//!
//! Everything is built once here and handed out as `Arc` handles; there are
//! no module-level globals anywhere in the workspace.

use std::sync::Arc;

use kotoba_agent::{EmotionAnalyzer, Orchestrator};
use kotoba_anthropic::AnthropicProvider;
use kotoba_config::KotobaConfig;
use kotoba_config::model::AgentConfig;
use kotoba_core::KotobaError;
use kotoba_knowledge::{ChunkStore, HttpEmbedder, IngestPipeline, Retriever};
use kotoba_storage::Database;

/// Knowledge base components handed to the subcommands.
pub struct Knowledge {
    pub ingest: Arc<IngestPipeline>,
    pub retriever: Arc<Retriever>,
}

/// Open the configured database.
pub async fn open_database(config: &KotobaConfig) -> Result<Database, KotobaError> {
    Database::open_with_wal(&config.storage.database_path, config.storage.wal_mode).await
}

/// Build the knowledge base components on top of an open database.
///
/// The chunk store shares the database's single writer thread, keeping the
/// one-writer-per-file discipline.
pub async fn build_knowledge(
    config: &KotobaConfig,
    db: &Database,
) -> Result<Knowledge, KotobaError> {
    let store = Arc::new(ChunkStore::open(db.connection().clone()).await?);
    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let ingest = Arc::new(IngestPipeline::new(
        embedder.clone(),
        store.clone(),
        &config.knowledge,
    )?);
    let retriever = Arc::new(Retriever::new(embedder, store, config.knowledge.top_k));
    Ok(Knowledge { ingest, retriever })
}

/// Build the orchestrator with its provider and emotion analyzer.
pub fn build_orchestrator(
    config: &KotobaConfig,
    db: Database,
    knowledge: &Knowledge,
) -> Result<Arc<Orchestrator>, KotobaError> {
    let provider = Arc::new(AnthropicProvider::new(&config.anthropic)?);
    let emotion = Arc::new(EmotionAnalyzer::new(
        provider.clone(),
        config.anthropic.default_model.clone(),
    ));
    let persona = resolve_persona(&config.agent)?;

    Ok(Arc::new(Orchestrator::new(
        db,
        provider,
        Some(knowledge.retriever.clone()),
        Some(emotion),
        persona,
        config.anthropic.default_model.clone(),
        config.anthropic.max_tokens,
    )))
}

/// Resolve the system persona: file takes precedence over the inline string.
pub fn resolve_persona(agent: &AgentConfig) -> Result<Option<String>, KotobaError> {
    if let Some(path) = &agent.system_prompt_file {
        let persona = std::fs::read_to_string(path).map_err(|e| {
            KotobaError::Config(format!("failed to read system_prompt_file {path}: {e}"))
        })?;
        return Ok(Some(persona));
    }
    Ok(agent.system_prompt.clone())
}

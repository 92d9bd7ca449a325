// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort retrieval of context passages for a query.
//!
//! Retrieval is enrichment, never a hard dependency of answering: when the
//! embedder or the index is unavailable the retriever logs the degradation
//! and returns an empty context set instead of failing the turn.

use std::sync::Arc;

use tracing::{debug, warn};

use kotoba_core::traits::EmbeddingAdapter;
use kotoba_core::types::EmbeddingInput;

use crate::store::ChunkStore;
use crate::types::Passage;

/// Retrieves the top-k most relevant passages for a query string.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingAdapter>,
    store: Arc<ChunkStore>,
    top_k: usize,
}

impl Retriever {
    /// Creates a retriever returning up to `top_k` passages per query.
    pub fn new(embedder: Arc<dyn EmbeddingAdapter>, store: Arc<ChunkStore>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    /// Embed the query and return the nearest passages, ordered by
    /// descending relevance.
    ///
    /// Infallible by design: any upstream failure degrades to an empty
    /// context set.
    pub async fn retrieve(&self, query: &str) -> Vec<Passage> {
        let output = match self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "query embedding failed, continuing without context");
                return vec![];
            }
        };

        let Some(query_vector) = output.embeddings.into_iter().next() else {
            warn!("embedder returned no vector for query, continuing without context");
            return vec![];
        };

        match self.store.query(&query_vector, self.top_k).await {
            Ok(results) => {
                debug!(passages = results.len(), "context retrieved");
                results
                    .into_iter()
                    .map(|scored| Passage {
                        text: scored.chunk.text,
                        source: scored.chunk.source,
                        score: scored.score,
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "vector index unavailable, continuing without context");
                vec![]
            }
        }
    }
}

// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::KotobaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating vector embeddings from text.
///
/// Side-effect-free from the caller's perspective: embedding the same input
/// yields the same output. Adapters do not retry internally; retry policy
/// belongs to the ingestion pipeline and retriever.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Generates embeddings for the given input, preserving input order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, KotobaError>;
}

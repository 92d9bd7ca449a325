// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base for the Kotoba assistant: document ingestion, a
//! SQLite-backed vector index, and best-effort retrieval.
//!
//! Ingestion writes into the index independent of conversation;
//! conversation reads from it via the [`Retriever`].

pub mod chunker;
pub mod embedder;
pub mod ingest;
pub mod retriever;
pub mod store;
pub mod types;

pub use embedder::HttpEmbedder;
pub use ingest::{IngestOutcome, IngestPipeline};
pub use retriever::Retriever;
pub use store::ChunkStore;
pub use types::{Chunk, EmbeddedChunk, Passage, ScoredChunk};

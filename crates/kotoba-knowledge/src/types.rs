// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base domain types.

use sha2::{Digest, Sha256};

/// A source document queued for ingestion.
///
/// Transient: consumed entirely during ingestion and not retained after
/// chunking.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Where the document came from.
    pub origin: DocumentOrigin,
    /// Full extracted text body.
    pub body: String,
}

/// Identifying origin of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOrigin {
    /// Fetched from a URL.
    Url(String),
    /// Uploaded file (PDF), identified by filename when known.
    File(String),
    /// Raw text supplied inline.
    Literal,
}

impl DocumentOrigin {
    /// Stable label stored alongside each chunk.
    pub fn label(&self) -> String {
        match self {
            DocumentOrigin::Url(url) => url.clone(),
            DocumentOrigin::File(name) => name.clone(),
            DocumentOrigin::Literal => "text".to_string(),
        }
    }
}

/// A bounded segment of a source document prepared for embedding.
///
/// Immutable once created. `seq` preserves original document order;
/// it is not required to be contiguous across documents in the index.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Unique chunk identifier.
    pub id: String,
    /// Origin label of the source document.
    pub source: String,
    /// Chunk text.
    pub text: String,
    /// Position of this chunk within its document.
    pub seq: i64,
    /// Character offset of the chunk start within the document.
    pub char_start: i64,
    /// Character offset one past the chunk end.
    pub char_end: i64,
}

/// A chunk paired with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// The chunk.
    pub chunk: Chunk,
    /// Fixed-dimension embedding, produced once and never mutated.
    pub embedding: Vec<f32>,
}

/// A chunk with its similarity score from a vector query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity against the query vector.
    pub score: f32,
}

/// A retrieved context passage handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct Passage {
    /// Passage text.
    pub text: String,
    /// Origin label of the source document.
    pub source: String,
    /// Retrieval score.
    pub score: f32,
}

/// SHA-256 hex digest of chunk text, used as the dedup key.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Convert an f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = content_hash("Paris is the capital of France.");
        let b = content_hash("Paris is the capital of France.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash("different text"));
    }

    #[test]
    fn vec_to_blob_roundtrip() {
        let original = vec![0.1_f32, 0.2, 0.3, -0.5, 1.0];
        let blob = vec_to_blob(&original);
        assert_eq!(blob.len(), 20);
        let recovered = blob_to_vec(&blob);
        assert_eq!(original.len(), recovered.len());
        for (a, b) in original.iter().zip(recovered.iter()) {
            assert!((a - b).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn cosine_similarity_identical() {
        let v = vec![0.3, 0.4, 0.5];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn origin_labels() {
        assert_eq!(
            DocumentOrigin::Url("https://example.com".into()).label(),
            "https://example.com"
        );
        assert_eq!(DocumentOrigin::File("doc.pdf".into()).label(), "doc.pdf");
        assert_eq!(DocumentOrigin::Literal.label(), "text");
    }
}

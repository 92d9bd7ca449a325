// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector index with BLOB embeddings and content-hash dedup.
//!
//! Chunk text and its embedding live in one row, so a reader never observes
//! one without the other. Batch upserts run in a single transaction on the
//! writer thread: a document becomes visible to queries all at once or not
//! at all.

use kotoba_core::KotobaError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::types::{
    Chunk, EmbeddedChunk, ScoredChunk, blob_to_vec, content_hash, cosine_similarity, vec_to_blob,
};

/// Convert tokio-rusqlite errors into the index error kind.
fn index_err(e: tokio_rusqlite::Error) -> KotobaError {
    KotobaError::Index {
        message: "chunk store unreachable".to_string(),
        source: Some(Box::new(e)),
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT NOT NULL,
    content_hash TEXT PRIMARY KEY NOT NULL,
    source TEXT NOT NULL,
    seq INTEGER NOT NULL,
    char_start INTEGER NOT NULL,
    char_end INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
";

/// Persistent store for (chunk, vector) pairs -- the single knowledge
/// collection backing retrieval.
///
/// The store exclusively owns chunk/vector lifetime. Re-upserting a chunk
/// with identical text hits the `content_hash` key and updates the existing
/// row in place (preserving its rowid, and with it insertion order), so
/// re-ingesting a document never accumulates duplicates.
pub struct ChunkStore {
    conn: Connection,
}

impl ChunkStore {
    /// Creates a ChunkStore wrapping an existing connection and ensures the
    /// chunk schema exists.
    pub async fn open(conn: Connection) -> Result<Self, KotobaError> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(index_err)?;
        Ok(Self { conn })
    }

    /// Insert or replace a batch of (chunk, vector) pairs, keyed by content
    /// hash. Returns the number of rows written.
    ///
    /// The batch is one transaction: concurrent queries see either none or
    /// all of it.
    pub async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<usize, KotobaError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut written = 0usize;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO chunks (id, content_hash, source, seq, char_start, char_end, text, embedding)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         ON CONFLICT(content_hash) DO UPDATE SET
                             source = excluded.source,
                             seq = excluded.seq,
                             char_start = excluded.char_start,
                             char_end = excluded.char_end,
                             embedding = excluded.embedding",
                    )?;
                    for item in &chunks {
                        let hash = content_hash(&item.chunk.text);
                        stmt.execute(rusqlite::params![
                            item.chunk.id,
                            hash,
                            item.chunk.source,
                            item.chunk.seq,
                            item.chunk.char_start,
                            item.chunk.char_end,
                            item.chunk.text,
                            vec_to_blob(&item.embedding),
                        ])?;
                        written += 1;
                    }
                }
                tx.commit()?;
                Ok(written)
            })
            .await
            .map_err(index_err)?;

        debug!(written, "chunks upserted");
        Ok(written)
    }

    /// Return the `k` chunks nearest to `query_vector` under cosine
    /// similarity, ordered descending by score; ties break by insertion
    /// order (earlier-inserted first).
    ///
    /// An empty collection yields an empty Vec, never an error.
    pub async fn query(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, KotobaError> {
        let query_vector = query_vector.to_vec();
        let mut scored = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT rowid, id, source, seq, char_start, char_end, text, embedding
                     FROM chunks",
                )?;
                let rows = stmt.query_map([], |row| {
                    let rowid: i64 = row.get(0)?;
                    let embedding_blob: Vec<u8> = row.get(7)?;
                    Ok((
                        rowid,
                        Chunk {
                            id: row.get(1)?,
                            source: row.get(2)?,
                            text: row.get(6)?,
                            seq: row.get(3)?,
                            char_start: row.get(4)?,
                            char_end: row.get(5)?,
                        },
                        blob_to_vec(&embedding_blob),
                    ))
                })?;
                let mut results = Vec::new();
                for row in rows {
                    let (rowid, chunk, embedding) = row?;
                    if embedding.len() != query_vector.len() {
                        continue;
                    }
                    let score = cosine_similarity(&query_vector, &embedding);
                    results.push((rowid, chunk, score));
                }
                Ok(results)
            })
            .await
            .map_err(index_err)?;

        // Descending score; insertion order (rowid ascending) breaks ties.
        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(_, chunk, score)| ScoredChunk { chunk, score })
            .collect())
    }

    /// Number of chunks currently stored.
    pub async fn count(&self) -> Result<usize, KotobaError> {
        self.conn
            .call(|conn| {
                let n: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(n as usize)
            })
            .await
            .map_err(index_err)
    }
}

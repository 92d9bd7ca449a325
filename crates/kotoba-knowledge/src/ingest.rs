// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion pipeline: fetch/parse a source, chunk it, embed the chunks,
//! and upsert them into the vector index.
//!
//! Three entry points (URL, raw text, PDF bytes) converge on one path after
//! source-specific parsing. A document is embedded in full before anything
//! is written, and the write is one transaction: ingestion never leaves a
//! partially-upserted document behind.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use kotoba_config::model::KnowledgeConfig;
use kotoba_core::KotobaError;
use kotoba_core::traits::EmbeddingAdapter;
use kotoba_core::types::EmbeddingInput;

use crate::chunker;
use crate::store::ChunkStore;
use crate::types::{Chunk, DocumentOrigin, EmbeddedChunk, SourceDocument};

/// Result of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The document was chunked, embedded, and written.
    Written {
        /// Number of chunks written to the index.
        chunks_written: usize,
    },
    /// The source parsed cleanly but contained no extractable text.
    /// Distinct from failure.
    NoContent,
}

/// Orchestrates parse -> chunk -> embed -> upsert for all source kinds.
pub struct IngestPipeline {
    embedder: Arc<dyn EmbeddingAdapter>,
    store: Arc<ChunkStore>,
    chunk_size: usize,
    chunk_overlap: usize,
    http: reqwest::Client,
}

impl IngestPipeline {
    /// Creates a pipeline with the configured chunking parameters.
    pub fn new(
        embedder: Arc<dyn EmbeddingAdapter>,
        store: Arc<ChunkStore>,
        config: &KnowledgeConfig,
    ) -> Result<Self, KotobaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| KotobaError::Fetch {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            embedder,
            store,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            http,
        })
    }

    /// Fetch a web page, extract its main textual content, and ingest it.
    ///
    /// Network and parse failures surface as `Fetch` errors; they are not
    /// retried here.
    pub async fn ingest_url(&self, url: &str) -> Result<IngestOutcome, KotobaError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| KotobaError::Fetch {
                message: format!("failed to fetch {url}: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KotobaError::Fetch {
                message: format!("fetching {url} returned {status}"),
                source: None,
            });
        }

        let html = response.text().await.map_err(|e| KotobaError::Fetch {
            message: format!("failed to read body of {url}: {e}"),
            source: Some(Box::new(e)),
        })?;

        let body = html2text::from_read(html.as_bytes(), 100).map_err(|e| KotobaError::Fetch {
            message: format!("failed to extract text from {url}: {e}"),
            source: None,
        })?;

        self.ingest_document(SourceDocument {
            origin: DocumentOrigin::Url(url.to_string()),
            body,
        })
        .await
    }

    /// Ingest raw text verbatim.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestOutcome, KotobaError> {
        self.ingest_document(SourceDocument {
            origin: DocumentOrigin::Literal,
            body: text.to_string(),
        })
        .await
    }

    /// Extract text from PDF bytes (reading order as the format allows) and
    /// ingest it.
    ///
    /// A PDF with no extractable text yields `NoContent`, not an error; a
    /// PDF that cannot be parsed at all is a `Fetch` error.
    pub async fn ingest_pdf(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IngestOutcome, KotobaError> {
        let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| KotobaError::Fetch {
            message: format!("failed to parse PDF {filename}: {e}"),
            source: None,
        })?;
        self.ingest_pdf_text(text, filename).await
    }

    /// Shared tail of PDF ingestion, split out so the no-content path is
    /// reachable without crafting PDF fixtures.
    pub(crate) async fn ingest_pdf_text(
        &self,
        text: String,
        filename: &str,
    ) -> Result<IngestOutcome, KotobaError> {
        if text.trim().is_empty() {
            info!(filename, "PDF contained no extractable text");
            return Ok(IngestOutcome::NoContent);
        }
        self.ingest_document(SourceDocument {
            origin: DocumentOrigin::File(filename.to_string()),
            body: text,
        })
        .await
    }

    /// Common pipeline: chunk, embed the whole batch, then write it in one
    /// transaction.
    async fn ingest_document(&self, doc: SourceDocument) -> Result<IngestOutcome, KotobaError> {
        let source = doc.origin.label();

        if doc.body.trim().is_empty() {
            warn!(source = source.as_str(), "document body is empty, nothing to ingest");
            return Ok(IngestOutcome::Written { chunks_written: 0 });
        }

        let spans = chunker::split_with_spans(&doc.body, self.chunk_size, self.chunk_overlap)?;
        let texts: Vec<String> = spans.iter().map(|(text, _, _)| text.clone()).collect();

        // Embed everything before writing anything: a mid-batch embedding
        // failure must not leave a partial document in the index.
        let output = self.embedder.embed(EmbeddingInput { texts }).await?;

        let embedded: Vec<EmbeddedChunk> = spans
            .into_iter()
            .zip(output.embeddings)
            .enumerate()
            .map(|(seq, ((text, start, end), embedding))| EmbeddedChunk {
                chunk: Chunk {
                    id: Uuid::new_v4().to_string(),
                    source: source.clone(),
                    text,
                    seq: seq as i64,
                    char_start: start as i64,
                    char_end: end as i64,
                },
                embedding,
            })
            .collect();

        let chunks_written = self.store.upsert(embedded).await?;
        info!(
            source = source.as_str(),
            chunks_written, "document ingested"
        );
        Ok(IngestOutcome::Written { chunks_written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kotoba_core::traits::PluginAdapter;
    use kotoba_core::types::{AdapterType, EmbeddingOutput, HealthStatus};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Deterministic test embedder: hashes bytes into a fixed-size vector.
    struct StubEmbedder {
        dimensions: usize,
        fail: bool,
    }

    impl StubEmbedder {
        fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                dimensions: 4,
                fail: true,
            }
        }

        fn encode(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0f32; self.dimensions];
            for (i, byte) in text.bytes().enumerate() {
                v[i % self.dimensions] += f32::from(byte) / 255.0;
            }
            v
        }
    }

    #[async_trait]
    impl PluginAdapter for StubEmbedder {
        fn name(&self) -> &str {
            "stub-embedder"
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
    impl EmbeddingAdapter for StubEmbedder {
        async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, KotobaError> {
            if self.fail {
                return Err(KotobaError::Embedding {
                    message: "stub embedder down".to_string(),
                    source: None,
                });
            }
            Ok(EmbeddingOutput {
                embeddings: input.texts.iter().map(|t| self.encode(t)).collect(),
                dimensions: self.dimensions,
            })
        }
    }

    async fn setup_pipeline(embedder: StubEmbedder) -> (IngestPipeline, Arc<ChunkStore>) {
        let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
        let store = Arc::new(ChunkStore::open(conn).await.unwrap());
        let config = KnowledgeConfig {
            chunk_size: 100,
            chunk_overlap: 10,
            top_k: 3,
        };
        let pipeline = IngestPipeline::new(Arc::new(embedder), store.clone(), &config).unwrap();
        (pipeline, store)
    }

    #[tokio::test]
    async fn ingest_text_writes_chunks() {
        let (pipeline, store) = setup_pipeline(StubEmbedder::new(4)).await;
        let text = "Paris is the capital of France. ".repeat(10);
        let outcome = pipeline.ingest_text(&text).await.unwrap();
        match outcome {
            IngestOutcome::Written { chunks_written } => {
                assert!(chunks_written > 1);
                assert_eq!(store.count().await.unwrap(), chunks_written);
            }
            other => panic!("expected Written, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reingesting_same_text_does_not_grow_index() {
        let (pipeline, store) = setup_pipeline(StubEmbedder::new(4)).await;
        let text = "The mitochondria is the powerhouse of the cell. ".repeat(8);

        pipeline.ingest_text(&text).await.unwrap();
        let count_first = store.count().await.unwrap();

        pipeline.ingest_text(&text).await.unwrap();
        let count_second = store.count().await.unwrap();

        assert_eq!(count_first, count_second);
    }

    #[tokio::test]
    async fn empty_text_writes_nothing() {
        let (pipeline, store) = setup_pipeline(StubEmbedder::new(4)).await;
        let outcome = pipeline.ingest_text("   \n  ").await.unwrap();
        assert_eq!(outcome, IngestOutcome::Written { chunks_written: 0 });
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn embedding_failure_writes_nothing() {
        let (pipeline, store) = setup_pipeline(StubEmbedder::failing()).await;
        let err = pipeline.ingest_text("some content worth keeping").await.unwrap_err();
        assert!(matches!(err, KotobaError::Embedding { .. }));
        // Nothing partial may land in the index.
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pdf_without_text_is_no_content() {
        let (pipeline, store) = setup_pipeline(StubEmbedder::new(4)).await;
        let outcome = pipeline
            .ingest_pdf_text("   ".to_string(), "scan.pdf")
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::NoContent);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unparseable_pdf_is_fetch_error() {
        let (pipeline, _store) = setup_pipeline(StubEmbedder::new(4)).await;
        let err = pipeline
            .ingest_pdf(b"definitely not a pdf", "broken.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, KotobaError::Fetch { .. }), "got {err}");
    }

    #[tokio::test]
    async fn ingest_url_extracts_page_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h1>Facts</h1><p>Paris is the capital of France.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let (pipeline, store) = setup_pipeline(StubEmbedder::new(4)).await;
        let outcome = pipeline
            .ingest_url(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert!(matches!(outcome, IngestOutcome::Written { chunks_written } if chunks_written > 0));

        let results = store.query(&[0.5, 0.5, 0.5, 0.5], 3).await.unwrap();
        assert!(results.iter().any(|r| r.chunk.text.contains("Paris")));
    }

    #[tokio::test]
    async fn ingest_url_surfaces_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (pipeline, _store) = setup_pipeline(StubEmbedder::new(4)).await;
        let err = pipeline
            .ingest_url(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, KotobaError::Fetch { .. }), "got {err}");
    }
}

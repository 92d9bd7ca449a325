// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP embedding adapter for OpenAI-compatible embedding endpoints.
//!
//! Targets `POST {base_url}/v1/embeddings` as served by Ollama, LM Studio,
//! and hosted providers. No internal retries: retry policy belongs to the
//! ingestion pipeline and retriever.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kotoba_config::model::EmbeddingConfig;
use kotoba_core::KotobaError;
use kotoba_core::traits::{EmbeddingAdapter, PluginAdapter};
use kotoba_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

/// Wire request for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Wire response from an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding adapter backed by an external HTTP embedding service.
///
/// Side-effect-free from the caller's perspective: the same input yields the
/// same output, and batch order is preserved.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Creates a new HTTP embedder from configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, KotobaError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| KotobaError::Config(format!("invalid embedding api key: {e}")))?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| KotobaError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Expected embedding dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbedder {
    fn name(&self) -> &str {
        "http-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, KotobaError> {
        // Embed a trivial probe; an unreachable service reports unhealthy.
        let probe = EmbeddingInput {
            texts: vec!["ping".to_string()],
        };
        match self.embed(probe).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "embedding service unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KotobaError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HttpEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, KotobaError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: vec![],
                dimensions: self.dimensions,
            });
        }

        let request = EmbeddingsRequest {
            model: &self.model,
            input: &input.texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| KotobaError::Embedding {
                message: format!("embedding request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KotobaError::Embedding {
                message: format!("embedding service returned {status}: {body}"),
                source: None,
            });
        }

        let body: EmbeddingsResponse =
            response.json().await.map_err(|e| KotobaError::Embedding {
                message: format!("failed to parse embedding response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if body.data.len() != input.texts.len() {
            return Err(KotobaError::Embedding {
                message: format!(
                    "embedding count mismatch: sent {} texts, got {} embeddings",
                    input.texts.len(),
                    body.data.len()
                ),
                source: None,
            });
        }

        // The endpoint reports an index per datum; order by it so output
        // order always matches input order.
        let mut data = body.data;
        data.sort_by_key(|d| d.index);

        let mut embeddings = Vec::with_capacity(data.len());
        for datum in data {
            if datum.embedding.len() != self.dimensions {
                return Err(KotobaError::Embedding {
                    message: format!(
                        "embedding dimension mismatch: expected {}, got {}",
                        self.dimensions,
                        datum.embedding.len()
                    ),
                    source: None,
                });
            }
            embeddings.push(datum.embedding);
        }

        debug!(count = embeddings.len(), "embeddings generated");
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, dimensions: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: base_url.to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            dimensions,
        }
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let server = MockServer::start().await;
        // Indices deliberately out of order in the response body.
        let body = serde_json::json!({
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ],
            "model": "nomic-embed-text"
        });
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 2)).unwrap();
        let output = embedder
            .embed(EmbeddingInput {
                texts: vec!["first".into(), "second".into()],
            })
            .await
            .unwrap();

        assert_eq!(output.embeddings.len(), 2);
        assert_eq!(output.embeddings[0], vec![1.0, 0.0]);
        assert_eq!(output.embeddings[1], vec![0.0, 1.0]);
        assert_eq!(output.dimensions, 2);
    }

    #[tokio::test]
    async fn upstream_failure_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 2)).unwrap();
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["text".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, KotobaError::Embedding { .. }), "got {err}");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [1.0, 0.0, 0.0]}],
            "model": "nomic-embed-text"
        });
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 2)).unwrap();
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["text".into()],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"), "got {err}");
    }

    #[tokio::test]
    async fn count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}],
            "model": "nomic-embed-text"
        });
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri(), 2)).unwrap();
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("count mismatch"), "got {err}");
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        // No mock server needed: the adapter never issues a request.
        let embedder = HttpEmbedder::new(&test_config("http://localhost:1", 2)).unwrap();
        let output = embedder.embed(EmbeddingInput { texts: vec![] }).await.unwrap();
        assert!(output.embeddings.is_empty());
    }
}

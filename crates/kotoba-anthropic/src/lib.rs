// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic provider adapter for the Kotoba assistant.
//!
//! Wraps the Messages API behind [`ProviderAdapter`], normalizing every
//! response into the single `{content, usage}` shape callers consume.

pub mod client;
pub mod types;

use async_trait::async_trait;

use kotoba_config::model::AnthropicConfig;
use kotoba_core::KotobaError;
use kotoba_core::traits::{PluginAdapter, ProviderAdapter};
use kotoba_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Provider adapter backed by the Anthropic Messages API.
pub struct AnthropicProvider {
    client: AnthropicClient,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Creates a provider from configuration.
    ///
    /// The API key comes from config or the `ANTHROPIC_API_KEY` environment
    /// variable; missing both is a configuration error.
    pub fn new(config: &AnthropicConfig) -> Result<Self, KotobaError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                KotobaError::Config(
                    "anthropic.api_key or ANTHROPIC_API_KEY must be set".to_string(),
                )
            })?;

        let client = AnthropicClient::new(
            api_key,
            config.api_version.clone(),
            config.default_model.clone(),
        )?;

        Ok(Self {
            client,
            max_tokens: config.max_tokens,
        })
    }

    /// Creates a provider around an existing client (used by tests).
    pub fn with_client(client: AnthropicClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, KotobaError> {
        // No side-effect-free ping endpoint exists; report healthy when the
        // client is constructed. Real failures surface on `complete`.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), KotobaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, KotobaError> {
        let model = if request.model.is_empty() {
            self.client.default_model().to_string()
        } else {
            request.model
        };
        let max_tokens = if request.max_tokens == 0 {
            self.max_tokens
        } else {
            request.max_tokens
        };

        let api_request = MessageRequest {
            model,
            messages: request
                .messages
                .into_iter()
                .map(|m| ApiMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            system: request.system_prompt,
            max_tokens,
            stream: false,
        };

        let response = self.client.complete_message(&api_request).await?;

        Ok(ProviderResponse {
            content: response.text(),
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kotoba_core::types::ProviderMessage;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> AnthropicProvider {
        let client = AnthropicClient::new(
            "test-key".into(),
            "2023-06-01".into(),
            "claude-sonnet-4-20250514".into(),
        )
        .unwrap()
        .with_base_url(server.uri());
        AnthropicProvider::with_client(client, 4096)
    }

    #[tokio::test]
    async fn complete_normalizes_to_text_and_usage() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "The capital of France is "},
                {"type": "text", "text": "Paris."}
            ],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 42, "output_tokens": 7}
        });
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let response = provider
            .complete(ProviderRequest {
                model: String::new(),
                system_prompt: Some("You are helpful.".into()),
                messages: vec![ProviderMessage::user("What is the capital of France?")],
                max_tokens: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.content, "The capital of France is Paris.");
        assert_eq!(response.usage.input_tokens, 42);
        assert_eq!(response.usage.output_tokens, 7);
    }

    #[tokio::test]
    async fn empty_model_falls_back_to_default() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "id": "msg_2",
            "role": "assistant",
            "content": [{"type": "text", "text": "ok"}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 4096
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let response = provider
            .complete(ProviderRequest {
                model: String::new(),
                system_prompt: None,
                messages: vec![ProviderMessage::user("hi")],
                max_tokens: 0,
            })
            .await
            .unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "nope"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .complete(ProviderRequest {
                model: String::new(),
                system_prompt: None,
                messages: vec![ProviderMessage::user("hi")],
                max_tokens: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, KotobaError::Provider { .. }));
    }

    #[tokio::test]
    async fn adapter_metadata() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.adapter_type(), AdapterType::Provider);
        assert_eq!(provider.version(), semver::Version::new(0, 1, 0));
    }
}

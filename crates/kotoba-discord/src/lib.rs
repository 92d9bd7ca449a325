// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord channel adapter for the Kotoba assistant.
//!
//! Implements [`ChannelAdapter`] over the Discord gateway websocket for
//! inbound messages and the REST API for outbound delivery. Discord caps
//! messages at 2,000 characters; the capability is reported so callers
//! split replies before sending.

mod gateway;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use kotoba_config::model::DiscordConfig;
use kotoba_core::KotobaError;
use kotoba_core::traits::{ChannelAdapter, PluginAdapter};
use kotoba_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};

/// Discord REST API base.
const API_BASE_URL: &str = "https://discord.com/api/v10";

/// Discord's message length limit.
const MAX_MESSAGE_LENGTH: usize = 2000;

/// Discord channel adapter implementing [`ChannelAdapter`].
pub struct DiscordChannel {
    token: String,
    http: reqwest::Client,
    api_base: String,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    gateway_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DiscordChannel {
    /// Creates a new Discord channel adapter.
    ///
    /// Requires `config.bot_token` to be set and non-empty.
    pub fn new(config: &DiscordConfig) -> Result<Self, KotobaError> {
        let token = config.bot_token.clone().ok_or_else(|| {
            KotobaError::Config("discord.bot_token is required for the Discord adapter".into())
        })?;
        if token.is_empty() {
            return Err(KotobaError::Config(
                "discord.bot_token cannot be empty".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| KotobaError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        Ok(Self {
            token,
            http,
            api_base: API_BASE_URL.to_string(),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            gateway_handle: None,
        })
    }

    /// Overrides the REST API base (for testing with wiremock).
    pub fn with_api_base(mut self, base: String) -> Self {
        self.api_base = base;
        self
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token)
    }
}

/// Extracts the destination Discord channel id from an outbound message.
fn extract_channel_id(msg: &OutboundMessage) -> Result<String, KotobaError> {
    if let Some(metadata) = &msg.metadata
        && let Ok(meta) = serde_json::from_str::<serde_json::Value>(metadata)
        && let Some(id) = meta.get("channel_id").and_then(|v| v.as_str())
    {
        return Ok(id.to_string());
    }

    // Fallback: the channel field may carry a numeric channel id directly.
    if msg.channel.chars().all(|c| c.is_ascii_digit()) && !msg.channel.is_empty() {
        return Ok(msg.channel.clone());
    }

    Err(KotobaError::Channel {
        message: "no discord channel_id in message metadata or channel field".into(),
        source: None,
    })
}

#[async_trait]
impl PluginAdapter for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, KotobaError> {
        let url = format!("{}/users/@me", self.api_base);
        match self
            .http
            .get(&url)
            .header("authorization", self.auth_header())
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Unhealthy(format!(
                "discord API returned {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "discord API unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), KotobaError> {
        debug!("discord channel shutting down");
        // The gateway task exits once the inbound queue is dropped; the
        // runner stops calling receive() before shutdown.
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for DiscordChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_typing: true,
            max_message_length: Some(MAX_MESSAGE_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), KotobaError> {
        if self.gateway_handle.is_some() {
            return Ok(()); // Already connected.
        }
        let token = self.token.clone();
        let tx = self.inbound_tx.clone();
        self.gateway_handle = Some(tokio::spawn(gateway::run(token, tx)));
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KotobaError> {
        let channel_id = extract_channel_id(&msg)?;
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        let response = self
            .http
            .post(&url)
            .header("authorization", self.auth_header())
            .json(&serde_json::json!({ "content": msg.content }))
            .send()
            .await
            .map_err(|e| KotobaError::Channel {
                message: format!("failed to send discord message: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KotobaError::Channel {
                message: format!("discord API returned {status}: {body}"),
                source: None,
            });
        }

        let body: serde_json::Value =
            response.json().await.map_err(|e| KotobaError::Channel {
                message: format!("failed to parse discord response: {e}"),
                source: Some(Box::new(e)),
            })?;
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<InboundMessage, KotobaError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| KotobaError::Channel {
            message: "discord inbound channel closed".into(),
            source: None,
        })
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), KotobaError> {
        let url = format!("{}/channels/{}/typing", self.api_base, chat_id);
        self.http
            .post(&url)
            .header("authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| KotobaError::Channel {
                message: format!("failed to send typing indicator: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

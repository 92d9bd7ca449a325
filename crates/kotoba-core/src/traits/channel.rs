// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging platform integrations.

use async_trait::async_trait;

use crate::error::KotobaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage};

/// Adapter for bidirectional messaging channel integrations.
///
/// Channel adapters connect Kotoba to external messaging platforms,
/// handling message ingestion and delivery. Callers are responsible for
/// splitting outbound content when `capabilities().max_message_length`
/// is exceeded.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), KotobaError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, KotobaError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, KotobaError>;

    /// Signals that the assistant is composing a reply. Best-effort.
    async fn send_typing(&self, _chat_id: &str) -> Result<(), KotobaError> {
        Ok(())
    }
}

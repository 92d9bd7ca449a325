// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives a channel adapter against the orchestrator and ingest pipeline.
//!
//! The runner owns the receive loop for one channel: it parses bot
//! commands, routes them to the orchestrator or the ingestion pipeline,
//! and sends replies back, splitting them when the channel reports a
//! maximum message length. Replies for a channel are produced in receipt
//! order because the loop processes one inbound message at a time.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use kotoba_core::KotobaError;
use kotoba_core::traits::ChannelAdapter;
use kotoba_core::types::{EmotionRecord, InboundMessage, OutboundMessage, split_message};
use kotoba_knowledge::{IngestOutcome, IngestPipeline};

use crate::{Orchestrator, TurnRequest};

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain conversation turn.
    Chat(String),
    /// Conversation turn with emotion analysis attached.
    Emotion(String),
    /// Ingest a web page.
    LearnUrl(String),
    /// Ingest raw text.
    LearnText(String),
    /// Ingest an attached PDF.
    LearnPdf,
    /// Show the command list.
    Help,
    /// Prefix present but command unrecognized.
    Unknown(String),
}

/// Parse an inbound message body into a [`Command`].
///
/// A message without the prefix is a plain chat turn (DM passthrough).
pub fn parse_command(content: &str, prefix: &str) -> Command {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix(prefix) else {
        return Command::Chat(trimmed.to_string());
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "chat" => Command::Chat(args.to_string()),
        "emotion" => Command::Emotion(args.to_string()),
        "learn_url" => Command::LearnUrl(args.to_string()),
        "learn_text" => Command::LearnText(args.to_string()),
        "learn_pdf" => Command::LearnPdf,
        "help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    }
}

/// Help text listing the supported commands.
fn help_text(prefix: &str) -> String {
    format!(
        "Commands:\n\
         {prefix}chat <message> - chat with the assistant\n\
         {prefix}emotion <message> - chat with emotion-aware responses\n\
         {prefix}learn_url <url> - add a web page to the knowledge base\n\
         {prefix}learn_text <text> - add text to the knowledge base\n\
         {prefix}learn_pdf - add an attached PDF to the knowledge base\n\
         {prefix}help - show this message"
    )
}

/// Drives one channel adapter: receive, execute, reply.
pub struct ChannelRunner {
    channel: Box<dyn ChannelAdapter>,
    orchestrator: Arc<Orchestrator>,
    ingest: Arc<IngestPipeline>,
    command_prefix: String,
    http: reqwest::Client,
}

impl ChannelRunner {
    /// Creates a runner for a connected channel adapter.
    pub fn new(
        channel: Box<dyn ChannelAdapter>,
        orchestrator: Arc<Orchestrator>,
        ingest: Arc<IngestPipeline>,
        command_prefix: String,
    ) -> Self {
        Self {
            channel,
            orchestrator,
            ingest,
            command_prefix,
            http: reqwest::Client::new(),
        }
    }

    /// Run the receive loop until the channel closes or `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), KotobaError> {
        self.channel.connect().await?;
        info!(channel = self.channel.name(), "channel runner started");

        loop {
            tokio::select! {
                inbound = self.channel.receive() => {
                    match inbound {
                        Ok(msg) => {
                            if let Err(e) = self.handle_inbound(msg).await {
                                error!(error = %e, "failed to handle inbound message");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "channel receive error, stopping runner");
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping channel runner");
                    break;
                }
            }
        }

        self.channel.shutdown().await?;
        Ok(())
    }

    /// Handle one inbound message: parse, execute, reply.
    async fn handle_inbound(&self, inbound: InboundMessage) -> Result<(), KotobaError> {
        let command = parse_command(&inbound.content, &self.command_prefix);
        debug!(
            sender_id = inbound.sender_id.as_str(),
            channel = inbound.channel.as_str(),
            ?command,
            "handling inbound message"
        );

        let thread_id = inbound
            .thread_id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", inbound.channel, inbound.sender_id));

        if self.channel.capabilities().supports_typing {
            let destination =
                extract_destination(&inbound.metadata).unwrap_or_else(|| inbound.channel.clone());
            if let Err(e) = self.channel.send_typing(&destination).await {
                debug!(error = %e, "failed to send typing indicator");
            }
        }

        let (reply, emotion) = match command {
            Command::Chat(text) if text.is_empty() => (
                "Please provide a message to chat with the assistant.".to_string(),
                None,
            ),
            Command::Chat(text) => {
                let turn = self
                    .orchestrator
                    .handle_turn(TurnRequest {
                        thread_id,
                        channel: inbound.channel.clone(),
                        utterance: text,
                        want_emotion: false,
                        want_retrieval: true,
                    })
                    .await;
                (turn.message, None)
            }
            Command::Emotion(text) if text.is_empty() => (
                "Please provide a message for the emotion-aware chat.".to_string(),
                None,
            ),
            Command::Emotion(text) => {
                let turn = self
                    .orchestrator
                    .handle_turn(TurnRequest {
                        thread_id,
                        channel: inbound.channel.clone(),
                        utterance: text,
                        want_emotion: true,
                        want_retrieval: true,
                    })
                    .await;
                (turn.message, turn.emotion)
            }
            Command::LearnUrl(url) if url.is_empty() => {
                ("Please provide a URL to learn from.".to_string(), None)
            }
            Command::LearnUrl(url) => (self.describe_ingest(self.ingest.ingest_url(&url).await), None),
            Command::LearnText(text) if text.is_empty() => {
                ("Please provide text to learn from.".to_string(), None)
            }
            Command::LearnText(text) => {
                (self.describe_ingest(self.ingest.ingest_text(&text).await), None)
            }
            Command::LearnPdf => (self.learn_pdf(&inbound).await, None),
            Command::Help => (help_text(&self.command_prefix), None),
            Command::Unknown(name) => (
                format!(
                    "Unknown command `{}{}`. Type {}help to see available commands.",
                    self.command_prefix, name, self.command_prefix
                ),
                None,
            ),
        };

        self.send_reply(&inbound, &reply).await?;
        if let Some(record) = emotion {
            self.send_reply(&inbound, &format_emotion(&record)).await?;
        }
        Ok(())
    }

    /// Download and ingest an attached PDF, if one was provided.
    async fn learn_pdf(&self, inbound: &InboundMessage) -> String {
        let Some(url) = &inbound.attachment_url else {
            return "Please attach a PDF file to learn from.".to_string();
        };

        let bytes = match self.http.get(url).send().await {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return format!("Failed to download the attachment: {e}"),
            },
            Err(e) => return format!("Failed to download the attachment: {e}"),
        };

        let filename = url.rsplit('/').next().unwrap_or("attachment.pdf");
        self.describe_ingest(self.ingest.ingest_pdf(&bytes, filename).await)
    }

    /// Turn an ingest outcome into a user-facing reply.
    fn describe_ingest(&self, outcome: Result<IngestOutcome, KotobaError>) -> String {
        match outcome {
            Ok(IngestOutcome::Written { chunks_written }) => {
                format!("Added {chunks_written} chunks to the knowledge base.")
            }
            Ok(IngestOutcome::NoContent) => {
                "The document contained no extractable text.".to_string()
            }
            Err(e) => {
                warn!(error = %e, "ingestion failed");
                format!("Could not ingest the document: {e}")
            }
        }
    }

    /// Send a reply, splitting it when the channel has a message length
    /// limit. Segments go out in order, preserving the original text.
    async fn send_reply(&self, inbound: &InboundMessage, content: &str) -> Result<(), KotobaError> {
        let segments = match self.channel.capabilities().max_message_length {
            Some(limit) => split_message(content, limit),
            None => vec![content.to_string()],
        };

        for segment in segments {
            self.channel
                .send(OutboundMessage {
                    thread_id: inbound.thread_id.clone(),
                    channel: inbound.channel.clone(),
                    content: segment,
                    metadata: inbound.metadata.clone(),
                })
                .await?;
        }
        Ok(())
    }
}

/// Extracts the platform destination id from inbound metadata.
fn extract_destination(metadata: &Option<String>) -> Option<String> {
    metadata.as_ref().and_then(|m| {
        serde_json::from_str::<serde_json::Value>(m)
            .ok()
            .and_then(|v| {
                v.get("channel_id")
                    .or_else(|| v.get("chat_id"))
                    .and_then(|c| c.as_str())
                    .map(String::from)
            })
    })
}

/// Compact human-readable rendering of an emotion record, sent as a
/// follow-up message after emotion-aware replies.
fn format_emotion(record: &EmotionRecord) -> String {
    format!(
        "Emotion analysis: {} (intensity {}/5, {} sentiment) - {}",
        record.primary_emotion, record.intensity, record.sentiment, record.explanation
    )
}

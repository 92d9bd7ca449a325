// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord gateway websocket client.
//!
//! Speaks the minimal slice of the gateway protocol the bot needs:
//! hello/heartbeat, identify, and MESSAGE_CREATE dispatch. Messages from
//! bots (including our own) are dropped before they reach the inbound
//! queue.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use kotoba_core::KotobaError;
use kotoba_core::types::InboundMessage;

/// Discord gateway endpoint.
const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT.
const INTENTS: u64 = (1 << 9) | (1 << 12) | (1 << 15);

/// Delay before reconnecting after a dropped gateway connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One frame from the gateway.
#[derive(Debug, Deserialize)]
pub(crate) struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

/// `d` payload of a hello frame.
#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

/// `d` payload of a MESSAGE_CREATE dispatch.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageCreate {
    pub id: String,
    pub channel_id: String,
    pub content: String,
    pub author: Author,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Author {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Attachment {
    pub url: String,
}

/// Map a MESSAGE_CREATE dispatch to the core inbound message shape.
///
/// The originating Discord channel id travels in metadata so replies can
/// find their way back.
pub(crate) fn to_inbound(msg: MessageCreate) -> InboundMessage {
    InboundMessage {
        id: msg.id,
        thread_id: None,
        channel: "discord".to_string(),
        sender_id: msg.author.id,
        content: msg.content,
        attachment_url: msg.attachments.first().map(|a| a.url.clone()),
        timestamp: chrono::Utc::now().to_rfc3339(),
        metadata: Some(
            serde_json::json!({ "channel_id": msg.channel_id }).to_string(),
        ),
    }
}

/// Run the gateway connection loop: connect, identify, pump events into
/// `tx`, reconnect on drop. Exits when the inbound queue is closed.
pub(crate) async fn run(token: String, tx: mpsc::Sender<InboundMessage>) {
    loop {
        match connect_and_listen(&token, &tx).await {
            Ok(()) => info!("discord gateway closed, reconnecting"),
            Err(e) => warn!(error = %e, "discord gateway error, reconnecting"),
        }
        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect_and_listen(
    token: &str,
    tx: &mpsc::Sender<InboundMessage>,
) -> Result<(), KotobaError> {
    let (ws, _) = connect_async(GATEWAY_URL)
        .await
        .map_err(|e| KotobaError::Channel {
            message: format!("failed to connect to discord gateway: {e}"),
            source: Some(Box::new(e)),
        })?;
    let (mut write, mut read) = ws.split();

    // First frame must be hello (op 10) carrying the heartbeat interval.
    let hello = loop {
        match read.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                let payload: GatewayPayload =
                    serde_json::from_str(&text).map_err(|e| KotobaError::Channel {
                        message: format!("malformed gateway frame: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                if payload.op == 10 {
                    let hello: Hello =
                        serde_json::from_value(payload.d).map_err(|e| KotobaError::Channel {
                            message: format!("malformed hello frame: {e}"),
                            source: Some(Box::new(e)),
                        })?;
                    break hello;
                }
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(KotobaError::Channel {
                    message: format!("gateway read error: {e}"),
                    source: Some(Box::new(e)),
                });
            }
            None => {
                return Err(KotobaError::Channel {
                    message: "gateway closed before hello".to_string(),
                    source: None,
                });
            }
        }
    };

    let identify = serde_json::json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": INTENTS,
            "properties": {"os": "linux", "browser": "kotoba", "device": "kotoba"}
        }
    });
    write
        .send(WsMessage::Text(identify.to_string().into()))
        .await
        .map_err(|e| KotobaError::Channel {
            message: format!("failed to send identify: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("discord gateway identified");

    let mut last_seq: Option<u64> = None;
    let mut heartbeat = tokio::time::interval(Duration::from_millis(hello.heartbeat_interval));
    // The first tick fires immediately, which doubles as the initial
    // heartbeat the gateway expects.
    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let beat = serde_json::json!({"op": 1, "d": last_seq});
                if let Err(e) = write.send(WsMessage::Text(beat.to_string().into())).await {
                    return Err(KotobaError::Channel {
                        message: format!("failed to send heartbeat: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let payload: GatewayPayload = match serde_json::from_str(&text) {
                            Ok(p) => p,
                            Err(e) => {
                                debug!(error = %e, "skipping malformed gateway frame");
                                continue;
                            }
                        };
                        if payload.s.is_some() {
                            last_seq = payload.s;
                        }
                        handle_dispatch(payload, tx).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(KotobaError::Channel {
                            message: format!("gateway read error: {e}"),
                            source: Some(Box::new(e)),
                        });
                    }
                }
            }
        }
    }
}

async fn handle_dispatch(payload: GatewayPayload, tx: &mpsc::Sender<InboundMessage>) {
    if payload.op != 0 || payload.t.as_deref() != Some("MESSAGE_CREATE") {
        return;
    }
    let msg: MessageCreate = match serde_json::from_value(payload.d) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "skipping malformed MESSAGE_CREATE");
            return;
        }
    };
    if msg.author.bot {
        return;
    }
    if tx.send(to_inbound(msg)).await.is_err() {
        warn!("inbound queue closed, dropping discord message");
    }
}

// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for duplex conversation.
//!
//! Client -> Server (JSON):
//! ```json
//! {"content": "Hello, what's the capital of France?", "thread_id": "optional", "want_emotion": false}
//! ```
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "message_complete", "content": "full reply", "thread_id": "...", "emotion_analysis": null}
//! {"type": "error", "content": "invalid message"}
//! ```
//!
//! Each connection owns an implicit thread unless the client names one.
//! Utterances are processed sequentially in receipt order, and every reply
//! is fully formed before transmission, so replies are emitted in the same
//! order as their triggering utterances.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kotoba_agent::TurnRequest;
use kotoba_core::types::EmotionRecord;

use crate::server::GatewayState;

/// WebSocket message from a client.
#[derive(Debug, Deserialize)]
struct WsIncoming {
    content: String,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    want_emotion: bool,
}

/// WebSocket message to a client.
#[derive(Debug, Serialize)]
struct WsOutgoing {
    #[serde(rename = "type")]
    kind: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion_analysis: Option<EmotionRecord>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection.
///
/// The loop awaits each turn before reading the next frame; this is what
/// guarantees reply ordering per connection.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    let connection_thread = format!("ws:{}", uuid::Uuid::new_v4());
    debug!(thread_id = connection_thread.as_str(), "websocket connected");

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let incoming: WsIncoming = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "invalid websocket message");
                        let out = WsOutgoing {
                            kind: "error",
                            content: format!("invalid message: {e}"),
                            thread_id: None,
                            emotion_analysis: None,
                        };
                        if send_json(&mut sender, &out).await.is_err() {
                            break;
                        }
                        continue;
                    }
                };

                let thread_id = incoming
                    .thread_id
                    .unwrap_or_else(|| connection_thread.clone());

                let reply = state
                    .orchestrator
                    .handle_turn(TurnRequest {
                        thread_id: thread_id.clone(),
                        channel: "ws".to_string(),
                        utterance: incoming.content,
                        want_emotion: incoming.want_emotion,
                        want_retrieval: true,
                    })
                    .await;

                let out = WsOutgoing {
                    kind: "message_complete",
                    content: reply.message,
                    thread_id: Some(thread_id),
                    emotion_analysis: reply.emotion,
                };
                if send_json(&mut sender, &out).await.is_err() {
                    // Client went away. Any appends already committed to
                    // the state store stand; nothing to roll back.
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {} // Ignore binary and ping/pong frames.
        }
    }

    debug!(thread_id = connection_thread.as_str(), "websocket disconnected");
}

async fn send_json<S>(sender: &mut S, out: &WsOutgoing) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let text = serde_json::to_string(out).map_err(|_| ())?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_incoming_deserializes_minimal() {
        let json = r#"{"content": "hello"}"#;
        let msg: WsIncoming = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content, "hello");
        assert!(msg.thread_id.is_none());
        assert!(!msg.want_emotion);
    }

    #[test]
    fn ws_incoming_deserializes_full() {
        let json = r#"{"content": "hi", "thread_id": "t-9", "want_emotion": true}"#;
        let msg: WsIncoming = serde_json::from_str(json).unwrap();
        assert_eq!(msg.thread_id.as_deref(), Some("t-9"));
        assert!(msg.want_emotion);
    }

    #[test]
    fn ws_outgoing_serializes_complete_message() {
        let out = WsOutgoing {
            kind: "message_complete",
            content: "reply".to_string(),
            thread_id: Some("t-1".to_string()),
            emotion_analysis: None,
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"type\":\"message_complete\""));
        assert!(json.contains("\"thread_id\":\"t-1\""));
        assert!(!json.contains("emotion_analysis"));
    }
}

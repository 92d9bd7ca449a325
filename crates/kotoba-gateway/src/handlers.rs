// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Conversation: `POST /chat`, `POST /emotion_chat`.
//! Ingestion: `POST /add_urls`, `POST /add_texts`, `POST /add_pdfs`.
//! Operations: `GET /health`, `GET /threads`, `DELETE /threads/{id}`.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use kotoba_agent::TurnRequest;
use kotoba_core::KotobaError;
use kotoba_core::types::EmotionRecord;
use kotoba_knowledge::IngestOutcome;
use kotoba_storage::queries::threads;

use crate::server::GatewayState;

/// Request body for `POST /chat` and `POST /emotion_chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's utterance.
    pub query: String,
    /// Thread to continue; a fresh thread is created when omitted.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Include knowledge base context. Defaults to true: the knowledge
    /// base exists to be used. Recency keywords trigger retrieval even
    /// when false.
    #[serde(default = "default_true")]
    pub use_retrieval: bool,
}

fn default_true() -> bool {
    true
}

/// Response body for conversation endpoints.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant reply text.
    pub message: String,
    /// Thread the exchange was appended to.
    pub thread_id: String,
    /// Emotion classification, present on `/emotion_chat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_analysis: Option<EmotionRecord>,
    /// Error detail when the turn degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request body for `POST /add_urls`.
#[derive(Debug, Deserialize)]
pub struct AddUrlRequest {
    /// Web page to fetch and ingest.
    pub url: String,
}

/// Request body for `POST /add_texts`.
#[derive(Debug, Deserialize)]
pub struct AddTextRequest {
    /// Raw text to ingest verbatim.
    pub text: String,
}

/// Query parameters for `POST /add_pdfs`.
#[derive(Debug, Deserialize)]
pub struct AddPdfParams {
    /// Original filename, used as the source label.
    #[serde(default)]
    pub filename: Option<String>,
}

/// Response body for ingestion endpoints.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// Human-readable outcome summary.
    pub message: String,
    /// Number of chunks written, absent on no-content outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_written: Option<usize>,
    /// Set when the source parsed cleanly but had no extractable text.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_content: bool,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
}

/// Response body for `GET /threads`.
#[derive(Debug, Serialize)]
pub struct ThreadListResponse {
    /// Known threads, most recently active first.
    pub threads: Vec<ThreadInfo>,
}

/// Information about a single thread.
#[derive(Debug, Serialize)]
pub struct ThreadInfo {
    /// Thread identifier.
    pub id: String,
    /// Channel the thread originates from.
    pub channel: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-activity timestamp.
    pub updated_at: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

async fn run_turn(state: &GatewayState, body: ChatRequest, want_emotion: bool) -> Response {
    let thread_id = body
        .thread_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let reply = state
        .orchestrator
        .handle_turn(TurnRequest {
            thread_id: thread_id.clone(),
            channel: "api".to_string(),
            utterance: body.query,
            want_emotion,
            want_retrieval: body.use_retrieval,
        })
        .await;

    let response = ChatResponse {
        message: reply.message,
        thread_id,
        emotion_analysis: reply.emotion,
        error: reply.error,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// `POST /chat` -- one conversation turn.
pub async fn post_chat(State(state): State<GatewayState>, Json(body): Json<ChatRequest>) -> Response {
    run_turn(&state, body, false).await
}

/// `POST /emotion_chat` -- one conversation turn with emotion analysis.
pub async fn post_emotion_chat(
    State(state): State<GatewayState>,
    Json(body): Json<ChatRequest>,
) -> Response {
    run_turn(&state, body, true).await
}

fn ingest_response(outcome: Result<IngestOutcome, KotobaError>) -> Response {
    match outcome {
        Ok(IngestOutcome::Written { chunks_written }) => (
            StatusCode::OK,
            Json(IngestResponse {
                message: format!("Added {chunks_written} chunks to the knowledge base."),
                chunks_written: Some(chunks_written),
                no_content: false,
            }),
        )
            .into_response(),
        Ok(IngestOutcome::NoContent) => (
            StatusCode::OK,
            Json(IngestResponse {
                message: "The document contained no extractable text.".to_string(),
                chunks_written: None,
                no_content: true,
            }),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "ingestion failed");
            let status = match &e {
                KotobaError::Fetch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// `POST /add_urls` -- fetch a web page into the knowledge base.
pub async fn post_add_urls(
    State(state): State<GatewayState>,
    Json(body): Json<AddUrlRequest>,
) -> Response {
    ingest_response(state.ingest.ingest_url(&body.url).await)
}

/// `POST /add_texts` -- add raw text to the knowledge base.
pub async fn post_add_texts(
    State(state): State<GatewayState>,
    Json(body): Json<AddTextRequest>,
) -> Response {
    ingest_response(state.ingest.ingest_text(&body.text).await)
}

/// `POST /add_pdfs` -- add a PDF to the knowledge base.
///
/// The request body is the raw PDF bytes; `?filename=` labels the source.
pub async fn post_add_pdfs(
    State(state): State<GatewayState>,
    Query(params): Query<AddPdfParams>,
    body: Bytes,
) -> Response {
    let filename = params.filename.unwrap_or_else(|| "upload.pdf".to_string());
    ingest_response(state.ingest.ingest_pdf(&body, &filename).await)
}

/// `GET /health` -- gateway liveness.
pub async fn get_health(State(_state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /threads` -- list known threads.
pub async fn get_threads(State(state): State<GatewayState>) -> Response {
    match threads::list_threads(&state.db).await {
        Ok(threads) => (
            StatusCode::OK,
            Json(ThreadListResponse {
                threads: threads
                    .into_iter()
                    .map(|t| ThreadInfo {
                        id: t.id,
                        channel: t.channel,
                        created_at: t.created_at,
                        updated_at: t.updated_at,
                    })
                    .collect(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// `DELETE /threads/{id}` -- reset a thread's history.
pub async fn delete_thread(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.orchestrator.reset_thread(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

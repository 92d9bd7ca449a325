// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Handlers call the
//! orchestrator and ingest pipeline directly through [`GatewayState`]; the
//! orchestrator instance is constructed once at process start and shared
//! by reference.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

use kotoba_agent::Orchestrator;
use kotoba_core::KotobaError;
use kotoba_knowledge::IngestPipeline;
use kotoba_storage::Database;

use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Conversation orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Document ingestion pipeline.
    pub ingest: Arc<IngestPipeline>,
    /// State store handle, used for thread listing.
    pub db: Database,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router. Exposed separately from [`start_server`] so
/// tests can drive it without binding a socket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/chat", post(handlers::post_chat))
        .route("/emotion_chat", post(handlers::post_emotion_chat))
        .route("/add_urls", post(handlers::post_add_urls))
        .route("/add_texts", post(handlers::post_add_texts))
        .route("/add_pdfs", post(handlers::post_add_pdfs))
        .route("/threads", get(handlers::get_threads))
        .route("/threads/{id}", delete(handlers::delete_thread))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP/WebSocket server.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), KotobaError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KotobaError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| KotobaError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

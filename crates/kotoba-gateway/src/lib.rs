// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket transport for the Kotoba assistant.
//!
//! Exposes the conversation endpoints (`/chat`, `/emotion_chat`), the
//! ingestion endpoints (`/add_urls`, `/add_texts`, `/add_pdfs`), thread
//! operations, and a duplex `/ws` channel with per-connection reply
//! ordering.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{GatewayState, ServerConfig, build_router, start_server};

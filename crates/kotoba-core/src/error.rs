// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kotoba assistant core.

use thiserror::Error;

/// The primary error type used across all Kotoba adapter traits and core operations.
///
/// Failures in optional enrichment (emotion, retrieval) are absorbed close to
/// where they occur; failures in the primary answer path (completion, history
/// persistence) surface through the reply object, never as an unhandled fault
/// reaching a transport.
#[derive(Debug, Error)]
pub enum KotobaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, message format, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM provider errors (API failure, token limits, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding service errors (upstream unreachable, bad response shape).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector index errors (collection unreachable, corrupt row).
    #[error("index error: {message}")]
    Index {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Document source fetch/parse errors during ingestion.
    #[error("fetch error: {message}")]
    Fetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A caller-supplied parameter was outside the valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A compare-and-append lost the race: the thread history changed underneath
    /// the caller. Expected to be retried with a freshly loaded history.
    #[error("concurrent modification on thread {thread_id}: expected length {expected}, found {actual}")]
    ConcurrentModification {
        thread_id: String,
        expected: usize,
        actual: usize,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

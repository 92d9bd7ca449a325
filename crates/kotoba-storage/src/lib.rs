// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Kotoba conversation state.
//!
//! Provides WAL-mode SQLite storage with an embedded schema, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for threads
//! and their append-only message histories, including the compare-and-append
//! primitive used to serialize racing turns.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;

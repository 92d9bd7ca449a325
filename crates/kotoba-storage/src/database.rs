// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use kotoba_core::KotobaError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into the workspace storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> KotobaError {
    KotobaError::Storage {
        source: Box::new(e),
    }
}

/// Convert a rusqlite error into the workspace storage error.
///
/// The connection-open entry points in tokio-rusqlite surface a bare
/// `rusqlite::Error` (not the wrapping `tokio_rusqlite::Error`).
pub(crate) fn map_rq_err(e: rusqlite::Error) -> KotobaError {
    KotobaError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database backing the conversation state store.
///
/// Cheap to clone: clones share the single background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at `path` and applies
    /// PRAGMAs and schema migrations.
    pub async fn open(path: &str) -> Result<Self, KotobaError> {
        Self::open_with_wal(path, true).await
    }

    /// Opens the database with explicit WAL-mode control.
    pub async fn open_with_wal(path: &str, wal_mode: bool) -> Result<Self, KotobaError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| KotobaError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path).await.map_err(map_rq_err)?;
        Self::initialize(&conn, wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Opens an in-memory database. Used by tests and ephemeral sessions.
    pub async fn open_in_memory() -> Result<Self, KotobaError> {
        let conn = Connection::open_in_memory().await.map_err(map_rq_err)?;
        Self::initialize(&conn, false).await?;
        Ok(Self { conn })
    }

    async fn initialize(conn: &Connection, wal_mode: bool) -> Result<(), KotobaError> {
        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            migrations::apply_schema(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
    }

    /// Returns the shared connection handle.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the database, flushing pending writes.
    pub async fn close(&self) -> Result<(), KotobaError> {
        // tokio-rusqlite closes on drop; an explicit checkpoint flushes WAL.
        self.conn
            .call(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
                    .ok();
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_in_memory_has_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('threads','messages')",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<i64, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        drop(db);
        let db2 = Database::open(path.to_str().unwrap()).await.unwrap();
        db2.close().await.unwrap();
    }
}

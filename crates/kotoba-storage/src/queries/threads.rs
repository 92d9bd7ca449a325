// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread bookkeeping operations.

use kotoba_core::KotobaError;
use kotoba_core::types::Thread;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Create the thread row if it does not exist yet and bump its activity
/// timestamp. Safe to call on every turn.
pub async fn ensure_thread(db: &Database, id: &str, channel: &str) -> Result<(), KotobaError> {
    let id = id.to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO threads (id, channel) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id, channel],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a thread by ID.
pub async fn get_thread(db: &Database, id: &str) -> Result<Option<Thread>, KotobaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel, created_at, updated_at FROM threads WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Thread {
                    id: row.get(0)?,
                    channel: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            });
            match result {
                Ok(thread) => Ok(Some(thread)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List threads, most recently active first.
pub async fn list_threads(db: &Database) -> Result<Vec<Thread>, KotobaError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel, created_at, updated_at FROM threads
                 ORDER BY updated_at DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Thread {
                    id: row.get(0)?,
                    channel: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?;
            let mut threads = Vec::new();
            for row in rows {
                threads.push(row?);
            }
            Ok(threads)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn ensure_thread_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        ensure_thread(&db, "t-1", "api").await.unwrap();
        ensure_thread(&db, "t-1", "api").await.unwrap();

        let threads = list_threads(&db).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id, "t-1");
        assert_eq!(threads[0].channel, "api");
    }

    #[tokio::test]
    async fn get_unknown_thread_returns_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_thread(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_threads_returns_all() {
        let db = Database::open_in_memory().await.unwrap();
        ensure_thread(&db, "t-1", "api").await.unwrap();
        ensure_thread(&db, "t-2", "discord").await.unwrap();
        let threads = list_threads(&db).await.unwrap();
        assert_eq!(threads.len(), 2);
    }
}

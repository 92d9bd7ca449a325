// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message history operations.
//!
//! Histories are append-only. The compare-and-append primitive
//! [`append_message_atomic`] is the serialization point that prevents lost
//! updates when two turns race on the same thread: the length check and the
//! insert execute inside one transaction on the single writer thread.

use kotoba_core::KotobaError;
use kotoba_core::types::{ChatMessage, Role};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Outcome of a compare-and-append attempt, resolved on the writer thread.
enum AppendOutcome {
    Written,
    Conflict { actual: usize },
}

fn row_to_message(row: &rusqlite::Row) -> Result<ChatMessage, rusqlite::Error> {
    let role: String = row.get(2)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        role: Role::from_str_value(&role),
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Load the full history for a thread in append order.
///
/// An unknown thread yields an empty history, never an error.
pub async fn get_messages_for_thread(
    db: &Database,
    thread_id: &str,
) -> Result<Vec<ChatMessage>, KotobaError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thread_id, role, content, created_at
                 FROM messages WHERE thread_id = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![thread_id], |row| {
                row_to_message(row)
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Count messages currently stored for a thread.
pub async fn count_messages(db: &Database, thread_id: &str) -> Result<usize, KotobaError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
        .await
        .map_err(map_tr_err)
}

/// Append one message unconditionally.
pub async fn append_message(db: &Database, msg: &ChatMessage) -> Result<(), KotobaError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, thread_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.thread_id,
                    msg.role.as_str(),
                    msg.content,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Append one message only if the thread history currently has exactly
/// `expected_len` messages.
///
/// Fails with [`KotobaError::ConcurrentModification`] when another writer got
/// there first; the caller reloads the history and retries.
pub async fn append_message_atomic(
    db: &Database,
    expected_len: usize,
    msg: &ChatMessage,
) -> Result<(), KotobaError> {
    let msg = msg.clone();
    let thread_id = msg.thread_id.clone();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let actual: i64 = tx.query_row(
                "SELECT COUNT(*) FROM messages WHERE thread_id = ?1",
                params![msg.thread_id],
                |row| row.get(0),
            )?;
            if actual as usize != expected_len {
                return Ok(AppendOutcome::Conflict {
                    actual: actual as usize,
                });
            }
            tx.execute(
                "INSERT INTO messages (id, thread_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.thread_id,
                    msg.role.as_str(),
                    msg.content,
                    msg.created_at,
                ],
            )?;
            tx.execute(
                "UPDATE threads SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![msg.thread_id],
            )?;
            tx.commit()?;
            Ok(AppendOutcome::Written)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        AppendOutcome::Written => Ok(()),
        AppendOutcome::Conflict { actual } => Err(KotobaError::ConcurrentModification {
            thread_id,
            expected: expected_len,
            actual,
        }),
    }
}

/// Clear a thread's history. Explicit, operator/user triggered only.
pub async fn reset_thread(db: &Database, thread_id: &str) -> Result<(), KotobaError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM messages WHERE thread_id = ?1",
                params![thread_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

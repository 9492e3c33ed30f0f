// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message cache operations.
//!
//! Every write is an upsert keyed by message id, so concurrent callers
//! (controller and Sync Engine) are last-write-wins safe without locking.

use std::str::FromStr;

use kasa_core::types::{Message, MessageKind, SyncStatus};
use kasa_core::KasaError;
use rusqlite::params;

use crate::database::Database;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, content, kind, is_read, created_at, sync_status";

fn message_from_row(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let kind: String = row.get(5)?;
    let sync_status: String = row.get(8)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        content: row.get(4)?,
        kind: MessageKind::from_str(&kind).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
        sync_status: SyncStatus::from_str(&sync_status).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}

fn upsert_in_tx(conn: &rusqlite::Connection, msg: &Message) -> Result<(), rusqlite::Error> {
    // ON CONFLICT UPDATE keeps the original rowid, so re-inserting an id
    // does not disturb insertion order.
    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content, kind,
                               is_read, created_at, sync_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             conversation_id = excluded.conversation_id,
             sender_id = excluded.sender_id,
             receiver_id = excluded.receiver_id,
             content = excluded.content,
             kind = excluded.kind,
             is_read = excluded.is_read,
             created_at = excluded.created_at,
             sync_status = excluded.sync_status",
        params![
            msg.id,
            msg.conversation_id,
            msg.sender_id,
            msg.receiver_id,
            msg.content,
            msg.kind.to_string(),
            msg.is_read,
            msg.created_at,
            msg.sync_status.to_string(),
        ],
    )?;
    Ok(())
}

/// Upsert a single message by id.
pub async fn upsert_message(db: &Database, msg: &Message) -> Result<(), KasaError> {
    let msg = msg.clone();
    db.call(move |conn| upsert_in_tx(conn, &msg)).await
}

/// Upsert a batch of messages in one transaction.
pub async fn upsert_batch(db: &Database, msgs: Vec<Message>) -> Result<(), KasaError> {
    db.call(move |conn| {
        let tx = conn.transaction()?;
        for msg in &msgs {
            upsert_in_tx(&tx, msg)?;
        }
        tx.commit()?;
        Ok(())
    })
    .await
}

/// All cached messages for a conversation, ascending by `created_at`,
/// ties broken by insertion order.
pub async fn get_by_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, KasaError> {
    let conversation_id = conversation_id.to_string();
    db.call(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![conversation_id], |row| message_from_row(row))?;
        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    })
    .await
}

/// Remove a message by id (used when swapping a temporary id for the
/// server-assigned one).
pub async fn delete_message(db: &Database, id: &str) -> Result<(), KasaError> {
    let id = id.to_string();
    db.call(move |conn| {
        conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
        Ok(())
    })
    .await
}

/// Set the sync status of one message without touching other fields.
pub async fn update_sync_status(
    db: &Database,
    id: &str,
    status: SyncStatus,
) -> Result<(), KasaError> {
    let id = id.to_string();
    db.call(move |conn| {
        conn.execute(
            "UPDATE messages SET sync_status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        Ok(())
    })
    .await
}

/// All messages still awaiting server confirmation (`pending` or `failed`),
/// across every conversation, in original send order.
pub async fn get_unsynced(db: &Database) -> Result<Vec<Message>, KasaError> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE sync_status IN ('pending', 'failed')
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map([], |row| message_from_row(row))?;
        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    })
    .await
}

/// Reset every `failed` message back to `pending`. Returns the number of
/// messages reset.
pub async fn reset_failed_to_pending(db: &Database) -> Result<usize, KasaError> {
    db.call(move |conn| {
        let n = conn.execute(
            "UPDATE messages SET sync_status = 'pending' WHERE sync_status = 'failed'",
            [],
        )?;
        Ok(n)
    })
    .await
}

/// Mark every stored message in the conversation not authored by
/// `local_user_id` as read. Returns the ids that were flipped.
pub async fn mark_all_read_for_conversation(
    db: &Database,
    conversation_id: &str,
    local_user_id: &str,
) -> Result<Vec<String>, KasaError> {
    let conversation_id = conversation_id.to_string();
    let local_user_id = local_user_id.to_string();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let ids = {
            let mut stmt = tx.prepare(
                "SELECT id FROM messages
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id, local_user_id], |row| {
                row.get::<_, String>(0)
            })?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            ids
        };
        if !ids.is_empty() {
            tx.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
                params![conversation_id, local_user_id],
            )?;
        }
        tx.commit()?;
        Ok(ids)
    })
    .await
}

/// Flip `is_read` on the given message ids, regardless of author.
pub async fn mark_read_by_ids(db: &Database, ids: Vec<String>) -> Result<(), KasaError> {
    if ids.is_empty() {
        return Ok(());
    }
    db.call(move |conn| {
        let tx = conn.transaction()?;
        for id in &ids {
            tx.execute("UPDATE messages SET is_read = 1 WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(())
    })
    .await
}

/// Retention sweep: delete `synced` messages older than `days`.
///
/// `pending` and `failed` records are never swept, whatever their age; they
/// are the Sync Engine's outstanding work.
pub async fn delete_older_than(db: &Database, days: u32) -> Result<usize, KasaError> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(i64::from(days)))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    db.call(move |conn| {
        let n = conn.execute(
            "DELETE FROM messages WHERE sync_status = 'synced' AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(n)
    })
    .await
}

/// Per-status record counts, for diagnostics.
pub async fn count_by_status(db: &Database) -> Result<Vec<(SyncStatus, i64)>, KasaError> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT sync_status, COUNT(*) FROM messages GROUP BY sync_status ORDER BY sync_status",
        )?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let status = SyncStatus::from_str(&status).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok((status, count))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, sender: &str, content: &str, timestamp: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "bk-1".to_string(),
            sender_id: sender.to_string(),
            receiver_id: None,
            content: content.to_string(),
            kind: MessageKind::Text,
            is_read: false,
            created_at: timestamp.to_string(),
            sync_status: SyncStatus::Synced,
        }
    }

    #[tokio::test]
    async fn insert_and_get_in_created_at_order() {
        let (db, _dir) = setup_db().await;

        // Inserted out of arrival order on purpose.
        let m2 = make_msg("m2", "peer", "second", "2026-01-01T00:00:02.000Z");
        let m1 = make_msg("m1", "me", "first", "2026-01-01T00:00:01.000Z");
        let m3 = make_msg("m3", "me", "third", "2026-01-01T00:00:03.000Z");
        upsert_message(&db, &m2).await.unwrap();
        upsert_message(&db, &m1).await.unwrap();
        upsert_message(&db, &m3).await.unwrap();

        let messages = get_by_conversation(&db, "bk-1").await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_same_id_twice_keeps_one_record() {
        let (db, _dir) = setup_db().await;

        let original = make_msg("m1", "me", "draft", "2026-01-01T00:00:01.000Z");
        upsert_message(&db, &original).await.unwrap();

        let mut replacement = original.clone();
        replacement.content = "final".to_string();
        replacement.sync_status = SyncStatus::Pending;
        upsert_message(&db, &replacement).await.unwrap();

        let messages = get_by_conversation(&db, "bk-1").await.unwrap();
        assert_eq!(messages.len(), 1, "no duplicate rows for one id");
        assert_eq!(messages[0].content, "final");
        assert_eq!(messages[0].sync_status, SyncStatus::Pending);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn batch_upsert_is_transactional_and_ordered() {
        let (db, _dir) = setup_db().await;

        let batch = vec![
            make_msg("m1", "me", "a", "2026-01-01T00:00:01.000Z"),
            make_msg("m2", "peer", "b", "2026-01-01T00:00:02.000Z"),
            make_msg("m3", "me", "c", "2026-01-01T00:00:03.000Z"),
        ];
        upsert_batch(&db, batch).await.unwrap();

        let messages = get_by_conversation(&db, "bk-1").await.unwrap();
        assert_eq!(messages.len(), 3);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unsynced_returns_pending_and_failed_in_send_order() {
        let (db, _dir) = setup_db().await;

        let mut p1 = make_msg("tmp-1", "me", "first", "2026-01-01T00:00:01.000Z");
        p1.sync_status = SyncStatus::Pending;
        let mut f1 = make_msg("tmp-2", "me", "second", "2026-01-01T00:00:02.000Z");
        f1.sync_status = SyncStatus::Failed;
        let synced = make_msg("srv-1", "peer", "fine", "2026-01-01T00:00:00.000Z");
        upsert_message(&db, &f1).await.unwrap();
        upsert_message(&db, &synced).await.unwrap();
        upsert_message(&db, &p1).await.unwrap();

        let unsynced = get_unsynced(&db).await.unwrap();
        let ids: Vec<_> = unsynced.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["tmp-1", "tmp-2"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_sync_status_leaves_other_fields_alone() {
        let (db, _dir) = setup_db().await;

        let mut msg = make_msg("tmp-1", "me", "hello", "2026-01-01T00:00:01.000Z");
        msg.sync_status = SyncStatus::Pending;
        upsert_message(&db, &msg).await.unwrap();

        update_sync_status(&db, "tmp-1", SyncStatus::Failed)
            .await
            .unwrap();

        let messages = get_by_conversation(&db, "bk-1").await.unwrap();
        assert_eq!(messages[0].sync_status, SyncStatus::Failed);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[0].created_at, "2026-01-01T00:00:01.000Z");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_failed_returns_count() {
        let (db, _dir) = setup_db().await;

        for (id, status) in [
            ("m1", SyncStatus::Failed),
            ("m2", SyncStatus::Failed),
            ("m3", SyncStatus::Pending),
        ] {
            let mut msg = make_msg(id, "me", "x", "2026-01-01T00:00:01.000Z");
            msg.sync_status = status;
            upsert_message(&db, &msg).await.unwrap();
        }

        let reset = reset_failed_to_pending(&db).await.unwrap();
        assert_eq!(reset, 2);
        let unsynced = get_unsynced(&db).await.unwrap();
        assert!(unsynced.iter().all(|m| m.sync_status == SyncStatus::Pending));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_id() {
        let (db, _dir) = setup_db().await;

        upsert_message(&db, &make_msg("m1", "me", "a", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &make_msg("m2", "me", "b", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();

        delete_message(&db, "m1").await.unwrap();

        let messages = get_by_conversation(&db, "bk-1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m2");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_all_read_skips_own_messages() {
        let (db, _dir) = setup_db().await;

        let mine = make_msg("m1", "me", "mine", "2026-01-01T00:00:01.000Z");
        let theirs = make_msg("m2", "peer", "theirs", "2026-01-01T00:00:02.000Z");
        let mut theirs_read = make_msg("m3", "peer", "seen", "2026-01-01T00:00:03.000Z");
        theirs_read.is_read = true;
        upsert_message(&db, &mine).await.unwrap();
        upsert_message(&db, &theirs).await.unwrap();
        upsert_message(&db, &theirs_read).await.unwrap();

        let flipped = mark_all_read_for_conversation(&db, "bk-1", "me")
            .await
            .unwrap();
        assert_eq!(flipped, vec!["m2".to_string()]);

        let messages = get_by_conversation(&db, "bk-1").await.unwrap();
        let m1 = messages.iter().find(|m| m.id == "m1").unwrap();
        let m2 = messages.iter().find(|m| m.id == "m2").unwrap();
        assert!(!m1.is_read, "own message untouched");
        assert!(m2.is_read, "peer message flipped");

        // Second call is a no-op.
        let flipped = mark_all_read_for_conversation(&db, "bk-1", "me")
            .await
            .unwrap();
        assert!(flipped.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn retention_sweep_spares_unsynced_regardless_of_age() {
        let (db, _dir) = setup_db().await;

        let ancient = "2020-01-01T00:00:00.000Z";
        let old_synced = make_msg("m1", "peer", "old", ancient);
        let mut old_pending = make_msg("tmp-1", "me", "stuck", ancient);
        old_pending.sync_status = SyncStatus::Pending;
        let mut old_failed = make_msg("tmp-2", "me", "broken", ancient);
        old_failed.sync_status = SyncStatus::Failed;
        let fresh = make_msg(
            "m2",
            "peer",
            "new",
            &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );
        upsert_message(&db, &old_synced).await.unwrap();
        upsert_message(&db, &old_pending).await.unwrap();
        upsert_message(&db, &old_failed).await.unwrap();
        upsert_message(&db, &fresh).await.unwrap();

        let removed = delete_older_than(&db, 30).await.unwrap();
        assert_eq!(removed, 1, "only the old synced record is swept");

        let remaining = get_by_conversation(&db, "bk-1").await.unwrap();
        let ids: Vec<_> = remaining.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains(&"tmp-1"));
        assert!(ids.contains(&"tmp-2"));
        assert!(ids.contains(&"m2"));
        assert!(!ids.contains(&"m1"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn count_by_status_groups_records() {
        let (db, _dir) = setup_db().await;

        for (id, status) in [
            ("m1", SyncStatus::Synced),
            ("m2", SyncStatus::Synced),
            ("tmp-1", SyncStatus::Pending),
        ] {
            let mut msg = make_msg(id, "me", "x", "2026-01-01T00:00:01.000Z");
            msg.sync_status = status;
            upsert_message(&db, &msg).await.unwrap();
        }

        let counts = count_by_status(&db).await.unwrap();
        let synced = counts
            .iter()
            .find(|(s, _)| *s == SyncStatus::Synced)
            .unwrap();
        assert_eq!(synced.1, 2);

        db.close().await.unwrap();
    }
}

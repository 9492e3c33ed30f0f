// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Local Message Store facade.

use kasa_core::KasaError;
use kasa_core::types::{Message, SyncStatus};
use tracing::debug;

use crate::database::Database;
use crate::queries::messages;

/// Durable, queryable on-device message cache, independent of network state.
///
/// Every operation is an idempotent upsert or a keyed update, so the
/// controller and the Sync Engine may call in concurrently without locking.
/// Storage failures surface as [`KasaError::Storage`] and are never retried
/// here; retry policy belongs to callers.
pub struct MessageStore {
    db: Database,
}

impl MessageStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: &str) -> Result<Self, KasaError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// All cached messages for a conversation, ascending by `created_at`.
    pub async fn get_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, KasaError> {
        messages::get_by_conversation(&self.db, conversation_id).await
    }

    /// Upsert one message by id.
    pub async fn insert(&self, msg: &Message) -> Result<(), KasaError> {
        messages::upsert_message(&self.db, msg).await
    }

    /// Upsert a batch of messages in one transaction.
    pub async fn insert_batch(&self, msgs: Vec<Message>) -> Result<(), KasaError> {
        messages::upsert_batch(&self.db, msgs).await
    }

    /// Remove a message by id.
    pub async fn delete(&self, id: &str) -> Result<(), KasaError> {
        messages::delete_message(&self.db, id).await
    }

    /// Set one message's sync status without touching other fields.
    pub async fn update_sync_status(
        &self,
        id: &str,
        status: SyncStatus,
    ) -> Result<(), KasaError> {
        messages::update_sync_status(&self.db, id, status).await
    }

    /// Messages awaiting server confirmation, across all conversations,
    /// in original send order.
    pub async fn get_unsynced(&self) -> Result<Vec<Message>, KasaError> {
        messages::get_unsynced(&self.db).await
    }

    /// Reset `failed` messages to `pending`. Returns how many were reset.
    pub async fn reset_failed_to_pending(&self) -> Result<usize, KasaError> {
        messages::reset_failed_to_pending(&self.db).await
    }

    /// Mark stored peer messages in the conversation as read; returns the
    /// flipped ids (empty when there was nothing unread).
    pub async fn mark_all_read_for_conversation(
        &self,
        conversation_id: &str,
        local_user_id: &str,
    ) -> Result<Vec<String>, KasaError> {
        messages::mark_all_read_for_conversation(&self.db, conversation_id, local_user_id).await
    }

    /// Flip `is_read` on the given ids, regardless of author.
    pub async fn mark_read_by_ids(&self, ids: Vec<String>) -> Result<(), KasaError> {
        messages::mark_read_by_ids(&self.db, ids).await
    }

    /// Retention sweep over `synced` messages older than `days`.
    pub async fn delete_older_than(&self, days: u32) -> Result<usize, KasaError> {
        let removed = messages::delete_older_than(&self.db, days).await?;
        if removed > 0 {
            debug!(removed, days, "retention sweep removed synced messages");
        }
        Ok(removed)
    }

    /// Per-status record counts, for diagnostics.
    pub async fn count_by_status(&self) -> Result<Vec<(SyncStatus, i64)>, KasaError> {
        messages::count_by_status(&self.db).await
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(self) -> Result<(), KasaError> {
        self.db.close().await
    }
}

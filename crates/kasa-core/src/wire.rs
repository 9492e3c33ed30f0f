// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire representation of a message as the server sends it.
//!
//! The server speaks camelCase and calls the conversation key `bookingId`;
//! the local [`Message`] is snake_case and carries a `sync_status` the server
//! never sees. Both the HTTP client and the realtime channel decode this
//! shape, so it lives here.

use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageKind, SyncStatus};

/// A message in the server's JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: String,
    pub booking_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub is_read: bool,
    pub created_at: String,
}

impl WireMessage {
    /// Convert into the local representation. Anything the server hands us
    /// is by definition durably accepted, so it lands `Synced`.
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.booking_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            kind: self.kind,
            is_read: self.is_read,
            created_at: self.created_at,
            sync_status: SyncStatus::Synced,
        }
    }
}

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Kasa workspace.
//!
//! A [`Message`] carries a local-only [`SyncStatus`] that never appears in the
//! server representation; the wire mapping lives in `kasa-client` and
//! `kasa-channel`. Timestamps are RFC3339 strings, stored as TEXT.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Prefix for locally generated temporary message ids.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Local synchronization state of a message record.
///
/// Absent from the server representation. `Pending` and `Failed` records are
/// the Sync Engine's work queue; `Synced` records are server-confirmed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

/// Kind of conversation content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
}

/// Lifecycle state of the shared realtime connection.
///
/// Process-wide: one socket serves every open conversation and the Sync
/// Engine. Transitions are driven by network events, never by a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A unit of conversation content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned permanent id, or a `tmp-` prefixed local id until the
    /// send is confirmed.
    pub id: String,
    /// The booking this conversation is tied to.
    pub conversation_id: String,
    pub sender_id: String,
    /// Unset until the server assigns it.
    pub receiver_id: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub is_read: bool,
    /// RFC3339 timestamp.
    pub created_at: String,
    /// Local-only; never sent to the server.
    pub sync_status: SyncStatus,
}

impl Message {
    /// Construct a locally authored message with a fresh temporary id and
    /// `Pending` status, stamped with the current time.
    pub fn outgoing(conversation_id: &str, sender_id: &str, content: &str) -> Self {
        Self {
            id: format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: None,
            content: content.to_string(),
            kind: MessageKind::Text,
            is_read: false,
            // Same format the server and the retention sweep use, so
            // lexicographic ordering on created_at stays consistent.
            created_at: chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            sync_status: SyncStatus::Pending,
        }
    }

    /// Whether this record still carries a locally generated temporary id.
    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }
}

/// A server-pushed event delivered through the realtime channel.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Echo of an own send or delivery of a peer send. `temp_id` is present
    /// on echoes so the client can reconcile its optimistic record.
    MessageReceived {
        message: Message,
        temp_id: Option<String>,
    },
    Typing {
        conversation_id: String,
        user_id: String,
        is_typing: bool,
    },
    Read {
        conversation_id: String,
        message_ids: Vec<String>,
    },
}

/// A client-emitted event sent through the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Send {
        conversation_id: String,
        content: String,
        kind: MessageKind,
        /// Correlation token the server deduplicates by and echoes back.
        temp_id: String,
    },
    Typing {
        conversation_id: String,
        is_typing: bool,
    },
    Read {
        conversation_id: String,
        message_ids: Vec<String>,
    },
}

impl ClientEvent {
    /// Wire event name for this client event.
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::Send { .. } => "message:send",
            ClientEvent::Typing { .. } => "message:typing",
            ClientEvent::Read { .. } => "message:read",
        }
    }
}

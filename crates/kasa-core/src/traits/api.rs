// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging API trait: the HTTP fallback path to the messaging server.

use async_trait::async_trait;

use crate::error::KasaError;
use crate::types::{Message, MessageKind};

/// The server's messaging API, used for history fetches and as the fallback
/// delivery path whenever the realtime channel is down.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Fetch the authoritative message history for a conversation.
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, KasaError>;

    /// Create a message. Returns the server copy with its assigned id.
    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message, KasaError>;

    /// Report the given message ids as read.
    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
    ) -> Result<(), KasaError>;

    /// Mark every unread peer message in the conversation as read.
    async fn mark_all_read(&self, conversation_id: &str) -> Result<(), KasaError>;
}

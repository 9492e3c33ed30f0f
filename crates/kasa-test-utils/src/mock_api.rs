// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging API for deterministic testing.
//!
//! `MockApi` implements `MessagingApi` in memory: scripted history, scripted
//! failures, and captured calls for assertion in tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use kasa_core::types::{Message, MessageKind, SyncStatus};
use kasa_core::{KasaError, MessagingApi};

/// A scriptable messaging API backend.
pub struct MockApi {
    history: Mutex<Vec<Message>>,
    sent: Mutex<Vec<(String, String)>>,
    read_calls: Mutex<Vec<(String, Vec<String>)>>,
    fail_fetch: AtomicBool,
    fail_all_sends: AtomicBool,
    fail_contents: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            read_calls: Mutex::new(Vec::new()),
            fail_fetch: AtomicBool::new(false),
            fail_all_sends: AtomicBool::new(false),
            fail_contents: Mutex::new(HashSet::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Script the history returned by `fetch_messages`.
    pub async fn set_history(&self, messages: Vec<Message>) {
        *self.history.lock().await = messages;
    }

    /// Make `fetch_messages` fail.
    pub fn set_fetch_fails(&self, fails: bool) {
        self.fail_fetch.store(fails, Ordering::SeqCst);
    }

    /// Make every `send_message` fail.
    pub fn set_send_fails(&self, fails: bool) {
        self.fail_all_sends.store(fails, Ordering::SeqCst);
    }

    /// Make `send_message` fail for one specific content string.
    pub async fn fail_send_of(&self, content: &str) {
        self.fail_contents.lock().await.insert(content.to_string());
    }

    /// Sends accepted so far, as (conversation_id, content) pairs.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    /// mark-read calls so far, as (conversation_id, message_ids) pairs.
    /// mark-all-read calls are recorded with an empty id list.
    pub async fn read_calls(&self) -> Vec<(String, Vec<String>)> {
        self.read_calls.lock().await.clone()
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingApi for MockApi {
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, KasaError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(KasaError::api("simulated fetch failure"));
        }
        Ok(self
            .history
            .lock()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message, KasaError> {
        if self.fail_all_sends.load(Ordering::SeqCst)
            || self.fail_contents.lock().await.contains(content)
        {
            return Err(KasaError::api("simulated send failure"));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent
            .lock()
            .await
            .push((conversation_id.to_string(), content.to_string()));
        Ok(Message {
            id: format!("srv-{n}"),
            conversation_id: conversation_id.to_string(),
            sender_id: "local-user".to_string(),
            receiver_id: Some("peer".to_string()),
            content: content.to_string(),
            kind,
            is_read: false,
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            sync_status: SyncStatus::Synced,
        })
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
    ) -> Result<(), KasaError> {
        self.read_calls
            .lock()
            .await
            .push((conversation_id.to_string(), message_ids.to_vec()));
        Ok(())
    }

    async fn mark_all_read(&self, conversation_id: &str) -> Result<(), KasaError> {
        self.read_calls
            .lock()
            .await
            .push((conversation_id.to_string(), Vec::new()));
        Ok(())
    }
}

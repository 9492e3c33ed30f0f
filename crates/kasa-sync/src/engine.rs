// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Sync Engine: replays unsynced messages after connectivity loss.
//!
//! Runs independently of any conversation view. A reconnect watcher fires
//! one sync pass per `… -> connected` edge; a manual retry entry point
//! resets `failed` records and replays them. One message's failure never
//! aborts the rest of a pass.

use std::sync::Arc;

use kasa_core::types::{ClientEvent, Message, SyncStatus};
use kasa_core::{KasaError, MessagingApi, RealtimeChannel};
use kasa_store::MessageStore;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counts from one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub synced: usize,
    pub failed: usize,
}

/// Reconciles the local message store with the server.
pub struct SyncEngine {
    store: Arc<MessageStore>,
    channel: Arc<dyn RealtimeChannel>,
    api: Arc<dyn MessagingApi>,
    // Serializes passes: concurrent callers (a session loop and the global
    // watcher on the same reconnect edge) must not both replay a message.
    pass_lock: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<MessageStore>,
        channel: Arc<dyn RealtimeChannel>,
        api: Arc<dyn MessagingApi>,
    ) -> Self {
        Self {
            store,
            channel,
            api,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replay every unsynced message in original send order.
    ///
    /// Per-message network failures are absorbed into `sync_status = failed`;
    /// only a storage failure on the initial scan aborts the pass.
    pub async fn sync_pending(&self) -> Result<SyncOutcome, KasaError> {
        let _pass = self.pass_lock.lock().await;
        let unsynced = self.store.get_unsynced().await?;
        if unsynced.is_empty() {
            debug!("no unsynced messages, nothing to do");
            return Ok(SyncOutcome::default());
        }

        info!(count = unsynced.len(), "replaying unsynced messages");
        let mut outcome = SyncOutcome::default();
        for msg in unsynced {
            match self.dispatch(&msg).await {
                Ok(()) => outcome.synced += 1,
                Err(e) => {
                    warn!(id = %msg.id, error = %e, "message replay failed");
                    self.store
                        .update_sync_status(&msg.id, SyncStatus::Failed)
                        .await?;
                    outcome.failed += 1;
                }
            }
        }
        info!(synced = outcome.synced, failed = outcome.failed, "sync pass done");
        Ok(outcome)
    }

    /// Reset `failed` messages to `pending` and replay them.
    ///
    /// Intended for a user-triggered retry action; never called
    /// automatically, so permanently rejected content cannot loop forever.
    pub async fn retry_failed(&self) -> Result<SyncOutcome, KasaError> {
        let reset = self.store.reset_failed_to_pending().await?;
        if reset == 0 {
            debug!("no failed messages to retry");
            return Ok(SyncOutcome::default());
        }
        info!(reset, "retrying failed messages");
        self.sync_pending().await
    }

    /// One replay attempt for one message.
    ///
    /// Connected: emit over the socket with the local id as the `tempId`
    /// correlation token (the server deduplicates by it) and mark `synced`
    /// optimistically; the echo is the real confirmation. Down: send over
    /// HTTP and swap the temp record for the server copy.
    async fn dispatch(&self, msg: &Message) -> Result<(), KasaError> {
        if self.channel.is_connected() {
            self.channel
                .emit(ClientEvent::Send {
                    conversation_id: msg.conversation_id.clone(),
                    content: msg.content.clone(),
                    kind: msg.kind,
                    temp_id: msg.id.clone(),
                })
                .await?;
            self.store
                .update_sync_status(&msg.id, SyncStatus::Synced)
                .await?;
        } else {
            let confirmed = self
                .api
                .send_message(&msg.conversation_id, &msg.content, msg.kind)
                .await?;
            self.store.delete(&msg.id).await?;
            self.store.insert(&confirmed).await?;
        }
        Ok(())
    }

    /// Watch connection-state transitions and run one sync pass per
    /// `… -> connected` edge.
    ///
    /// Edge-triggered: a redundant `connected` ping while already connected
    /// fires nothing.
    pub async fn watch_reconnects(&self, cancel: CancellationToken) {
        let mut status = self.channel.status_changes();
        // Baseline is disconnected, not a snapshot: a transition landing
        // between subscribe and snapshot would hide the first edge, and an
        // extra pass is a no-op while a missed one strands the backlog.
        let mut was_connected = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = status.recv() => match next {
                    Ok(state) => {
                        let connected = state == kasa_core::ConnectionState::Connected;
                        if connected && !was_connected {
                            info!("connectivity restored, running sync pass");
                            if let Err(e) = self.sync_pending().await {
                                warn!(error = %e, "reconnect sync pass failed");
                            }
                        }
                        was_connected = connected;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "status stream lagged");
                        was_connected = self.channel.is_connected();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

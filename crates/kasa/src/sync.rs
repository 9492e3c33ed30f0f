// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kasa sync` and `kasa retry` command implementations.
//!
//! Replays the unsynced backlog over HTTP. The CLI never opens the realtime
//! socket; the channel stays disconnected, so the engine takes its HTTP
//! fallback path for every message.

use std::sync::Arc;

use kasa_channel::WsChannel;
use kasa_client::HttpMessagingApi;
use kasa_config::model::KasaConfig;
use kasa_core::{KasaError, MessagingApi, RealtimeChannel};
use kasa_store::MessageStore;
use kasa_sync::SyncEngine;
use tracing::info;

/// Run the `kasa sync` command, or `kasa retry` when `retry` is set.
pub async fn run_sync(config: &KasaConfig, retry: bool) -> Result<(), KasaError> {
    let store = Arc::new(MessageStore::open(&config.storage.database_path).await?);
    // Never started: reports disconnected, forcing the HTTP path.
    let channel = Arc::new(WsChannel::new(&config.realtime));
    let api = Arc::new(HttpMessagingApi::new(&config.api)?);

    let engine = SyncEngine::new(
        store,
        channel as Arc<dyn RealtimeChannel>,
        api as Arc<dyn MessagingApi>,
    );
    let outcome = if retry {
        engine.retry_failed().await?
    } else {
        engine.sync_pending().await?
    };

    info!(synced = outcome.synced, failed = outcome.failed, "replay finished");
    println!("synced {} message(s), {} failed", outcome.synced, outcome.failed);
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kasa status` command implementation.
//!
//! Opens the local message store and reports per-status record counts, so an
//! operator can see the sync backlog at a glance without the app running.

use kasa_config::model::KasaConfig;
use kasa_core::KasaError;
use kasa_core::types::SyncStatus;
use kasa_store::MessageStore;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub synced: i64,
    pub pending: i64,
    pub failed: i64,
}

/// Run the `kasa status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
pub async fn run_status(config: &KasaConfig, json: bool) -> Result<(), KasaError> {
    let store = MessageStore::open(&config.storage.database_path).await?;
    let counts = store.count_by_status().await?;
    store.close().await?;

    let mut response = StatusResponse {
        database_path: config.storage.database_path.clone(),
        synced: 0,
        pending: 0,
        failed: 0,
    };
    for (status, count) in counts {
        match status {
            SyncStatus::Synced => response.synced = count,
            SyncStatus::Pending => response.pending = count,
            SyncStatus::Failed => response.failed = count,
        }
    }

    if json {
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| KasaError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        println!("database: {}", response.database_path);
        println!("  synced:  {}", response.synced);
        println!("  pending: {}", response.pending);
        println!("  failed:  {}", response.failed);
        if response.pending + response.failed > 0 {
            println!("run `kasa sync` (or `kasa retry` for failed) to replay the backlog");
        }
    }
    Ok(())
}

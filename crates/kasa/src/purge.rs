// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kasa purge` command implementation.

use kasa_config::model::KasaConfig;
use kasa_core::KasaError;
use kasa_store::MessageStore;

/// Run the retention sweep: delete synced messages older than the configured
/// window. Pending and failed records are never purged.
pub async fn run_purge(config: &KasaConfig) -> Result<(), KasaError> {
    let store = MessageStore::open(&config.storage.database_path).await?;
    let removed = store.delete_older_than(config.storage.retention_days).await?;
    store.close().await?;
    println!(
        "removed {removed} synced message(s) older than {} day(s)",
        config.storage.retention_days
    );
    Ok(())
}

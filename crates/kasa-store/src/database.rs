// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access is serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use kasa_core::KasaError;
use tracing::debug;

use crate::migrations;

/// Handle to the on-device SQLite message cache.
///
/// Wraps a single `tokio_rusqlite::Connection`; every query in this crate
/// goes through [`Database::call`], so all access runs on one background
/// thread and SQLITE_BUSY cannot occur under concurrent callers.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, applying PRAGMAs and all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, KasaError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| KasaError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| KasaError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), KasaError> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
            .map_err(|e| KasaError::Storage {
                source: Box::new(e),
            })?;
            migrations::run_migrations(conn).map_err(|e| KasaError::Storage {
                source: Box::new(e),
            })?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "message cache opened");
        Ok(Self { conn })
    }

    /// Run a closure against the connection on the background thread.
    ///
    /// The closure works in plain `rusqlite` terms; transport and SQL errors
    /// both surface as [`KasaError::Storage`].
    pub async fn call<F, R>(&self, f: F) -> Result<R, KasaError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        self.conn.call(f).await.map_err(map_tr_err)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), KasaError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("message cache closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite transport error into the crate error type.
pub(crate) fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> KasaError
where
    E: std::error::Error + Send + Sync + 'static,
{
    KasaError::Storage {
        source: Box::new(e),
    }
}

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kasa chat engine.

use thiserror::Error;

/// The primary error type used across all Kasa crates.
#[derive(Debug, Error)]
pub enum KasaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Local message store errors (database open, query failure, corruption).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Realtime channel errors (socket failure, frame encoding, dropped connection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging API errors (HTTP transport failure, non-2xx status, bad payload).
    #[error("api error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An emit was attempted while the realtime channel was down.
    ///
    /// Callers are expected to check `is_connected()` first or fall back to HTTP.
    #[error("realtime channel is not connected")]
    NotConnected,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KasaError {
    /// Shorthand for a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        KasaError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an API error without an underlying source.
    pub fn api(message: impl Into<String>) -> Self {
        KasaError::Api {
            message: message.into(),
            source: None,
        }
    }
}

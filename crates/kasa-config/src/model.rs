// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kasa chat engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Kasa configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KasaConfig {
    /// Local message store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Messaging API (HTTP fallback) settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Realtime channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Per-conversation chat behavior settings.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Local message store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite message cache.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Retention window in days for the synced-message sweep.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("kasa/messages.db").display().to_string())
        .unwrap_or_else(|| "kasa-messages.db".to_string())
}

fn default_retention_days() -> u32 {
    30
}

/// Messaging API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the messaging API, e.g. `https://api.example.com/api`.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:4000/api".to_string()
}

fn default_api_timeout_secs() -> u64 {
    30
}

/// Realtime channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// WebSocket URL of the messaging server.
    #[serde(default = "default_realtime_url")]
    pub url: String,

    /// Initial reconnect backoff in milliseconds.
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Backoff cap in milliseconds.
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_realtime_url(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
        }
    }
}

fn default_realtime_url() -> String {
    "ws://localhost:4000/ws".to_string()
}

fn default_reconnect_initial_ms() -> u64 {
    500
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

/// Per-conversation chat behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// How long a peer typing indicator stays set without a refresh.
    #[serde(default = "default_typing_timeout_ms")]
    pub typing_timeout_ms: u64,

    /// Delay before the automatic read receipt after a peer message arrives.
    #[serde(default = "default_read_receipt_throttle_ms")]
    pub read_receipt_throttle_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            typing_timeout_ms: default_typing_timeout_ms(),
            read_receipt_throttle_ms: default_read_receipt_throttle_ms(),
        }
    }
}

fn default_typing_timeout_ms() -> u64 {
    3_000
}

fn default_read_receipt_throttle_ms() -> u64 {
    500
}

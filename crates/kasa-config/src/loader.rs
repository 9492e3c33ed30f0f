// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kasa.toml` > `~/.config/kasa/kasa.toml` >
//! `/etc/kasa/kasa.toml` with environment variable overrides via `KASA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KasaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kasa/kasa.toml` (system-wide)
/// 3. `~/.config/kasa/kasa.toml` (user XDG config)
/// 4. `./kasa.toml` (local directory)
/// 5. `KASA_*` environment variables
pub fn load_config() -> Result<KasaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KasaConfig::default()))
        .merge(Toml::file("/etc/kasa/kasa.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kasa/kasa.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kasa.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KasaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KasaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KasaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KasaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KASA_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("KASA_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("api_", "api.", 1)
            .replacen("realtime_", "realtime.", 1)
            .replacen("chat_", "chat.", 1);
        mapped.into()
    })
}

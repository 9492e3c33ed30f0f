// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL schemes and non-zero timing windows.

use crate::ConfigError;
use crate::model::KasaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KasaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.retention_days == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.retention_days must be at least 1".to_string(),
        });
    }

    let api_url = config.api.base_url.trim();
    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("api.base_url `{api_url}` must be an http(s) URL"),
        });
    }

    let rt_url = config.realtime.url.trim();
    if !rt_url.starts_with("ws://") && !rt_url.starts_with("wss://") {
        errors.push(ConfigError::Validation {
            message: format!("realtime.url `{rt_url}` must be a ws(s) URL"),
        });
    }

    if config.realtime.reconnect_initial_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.reconnect_initial_ms must be at least 1".to_string(),
        });
    }

    if config.realtime.reconnect_max_ms < config.realtime.reconnect_initial_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "realtime.reconnect_max_ms ({}) must not be below reconnect_initial_ms ({})",
                config.realtime.reconnect_max_ms, config.realtime.reconnect_initial_ms
            ),
        });
    }

    if config.chat.typing_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "chat.typing_timeout_ms must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

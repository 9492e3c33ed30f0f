// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kasa offline-aware chat engine.
//!
//! This crate provides the domain types, the error type, and the trait
//! definitions for the two network seams (realtime channel, messaging API)
//! used throughout the Kasa workspace.

pub mod error;
pub mod traits;
pub mod types;
pub mod wire;

// Re-export key items at crate root for ergonomic imports.
pub use error::KasaError;
pub use traits::{MessagingApi, RealtimeChannel};
pub use types::{
    ChatEvent, ClientEvent, ConnectionState, Message, MessageKind, SyncStatus, TEMP_ID_PREFIX,
};
pub use wire::WireMessage;

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime channel manager for the Kasa chat engine.
//!
//! Maintains the single persistent WebSocket connection to the messaging
//! server, fans inbound events out to subscribers, and reports every
//! connection-state transition. All conversations and the Sync Engine share
//! this one reconnection lifecycle.

pub mod channel;
pub mod wire;

pub use channel::WsChannel;

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime channel trait: the single shared connection to the messaging server.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::KasaError;
use crate::types::{ChatEvent, ClientEvent, ConnectionState};

/// The single shared realtime connection to the messaging server.
///
/// Exactly one implementation instance exists per process; every open
/// conversation and the Sync Engine share its reconnection lifecycle. The
/// implementation is the only place that touches the underlying transport.
///
/// Subscription is a broadcast channel rather than registered callbacks:
/// every receiver sees events in emission order, and dropping the receiver
/// unsubscribes.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Snapshot of the current connection state.
    fn is_connected(&self) -> bool;

    /// Subscribe to server-pushed chat events.
    fn subscribe(&self) -> broadcast::Receiver<ChatEvent>;

    /// Subscribe to connection-state transitions.
    ///
    /// One value per transition, transient flaps included; receivers that
    /// need edge-triggered behavior track the previous state themselves.
    fn status_changes(&self) -> broadcast::Receiver<ConnectionState>;

    /// Send an event to the server.
    ///
    /// Fails with [`KasaError::NotConnected`] when the channel is down;
    /// callers check [`is_connected`](Self::is_connected) first or handle
    /// the failure.
    async fn emit(&self, event: ClientEvent) -> Result<(), KasaError>;
}

// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock realtime channel for deterministic testing.
//!
//! `MockChannel` implements `RealtimeChannel` with a manually driven
//! connection state, injectable server events, and captured emits for
//! assertion in tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use kasa_core::types::{ChatEvent, ClientEvent, ConnectionState};
use kasa_core::{KasaError, RealtimeChannel};

/// A scriptable realtime channel.
///
/// Tests drive connectivity with [`set_connected`](Self::set_connected),
/// push server events with [`push_event`](Self::push_event), and read back
/// everything the code under test emitted.
pub struct MockChannel {
    connected: AtomicBool,
    emit_fails: AtomicBool,
    events_tx: broadcast::Sender<ChatEvent>,
    status_tx: broadcast::Sender<ConnectionState>,
    emitted: Mutex<Vec<ClientEvent>>,
}

impl MockChannel {
    /// New channel, starting disconnected.
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(64);
        let (status_tx, _) = broadcast::channel(64);
        Self {
            connected: AtomicBool::new(false),
            emit_fails: AtomicBool::new(false),
            events_tx,
            status_tx,
            emitted: Mutex::new(Vec::new()),
        }
    }

    /// Flip connectivity and broadcast the transition.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
        let state = if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        let _ = self.status_tx.send(state);
    }

    /// Broadcast a transition without changing the snapshot, to simulate
    /// redundant status pings.
    pub fn ping_status(&self, state: ConnectionState) {
        let _ = self.status_tx.send(state);
    }

    /// Deliver a server event to all subscribers.
    pub fn push_event(&self, event: ChatEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Make subsequent emits fail even while "connected".
    pub fn set_emit_fails(&self, fails: bool) {
        self.emit_fails.store(fails, Ordering::SeqCst);
    }

    /// Everything emitted so far, in order.
    pub async fn emitted(&self) -> Vec<ClientEvent> {
        self.emitted.lock().await.clone()
    }

    /// Number of emitted events.
    pub async fn emitted_count(&self) -> usize {
        self.emitted.lock().await.len()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeChannel for MockChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events_tx.subscribe()
    }

    fn status_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    async fn emit(&self, event: ClientEvent) -> Result<(), KasaError> {
        if !self.is_connected() {
            return Err(KasaError::NotConnected);
        }
        if self.emit_fails.load(Ordering::SeqCst) {
            return Err(KasaError::channel("simulated emit failure"));
        }
        self.emitted.lock().await.push(event);
        Ok(())
    }
}

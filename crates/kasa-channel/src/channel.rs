// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared WebSocket connection to the messaging server.
//!
//! One `WsChannel` exists per process. A single background task owns the
//! socket: it reconnects with capped exponential backoff, decodes inbound
//! frames into [`ChatEvent`]s, and writes outbound frames handed over from
//! [`emit`](WsChannel::emit). Everyone else sees only broadcast receivers
//! and the connection-state snapshot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use kasa_config::model::RealtimeConfig;
use kasa_core::types::{ChatEvent, ClientEvent, ConnectionState};
use kasa_core::{KasaError, RealtimeChannel};
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::wire;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const STATUS_CHANNEL_CAPACITY: usize = 32;
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

struct Shared {
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ChatEvent>,
    status_tx: broadcast::Sender<ConnectionState>,
    outbound_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl Shared {
    /// Record a state change and broadcast the transition. Repeats of the
    /// current state are swallowed so subscribers only see real transitions.
    fn set_state(&self, new: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|cur| {
            if *cur == new {
                false
            } else {
                *cur = new;
                true
            }
        });
        if changed {
            debug!(state = %new, "connection state changed");
            let _ = self.status_tx.send(new);
        }
    }
}

/// WebSocket-backed implementation of [`RealtimeChannel`].
#[derive(Clone)]
pub struct WsChannel {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<ConnectionState>,
    config: RealtimeConfig,
    // Taken by the background task on start().
    outbound_rx: Arc<Mutex<Option<mpsc::Receiver<String>>>>,
}

impl WsChannel {
    /// Build the channel without touching the network.
    ///
    /// Call [`start`](Self::start) to spawn the connection task; building and
    /// starting are separate so tests can subscribe before the first
    /// transition fires.
    pub fn new(config: &RealtimeConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state_tx,
                events_tx,
                status_tx,
                outbound_tx,
                cancel: CancellationToken::new(),
            }),
            state_rx,
            config: config.clone(),
            outbound_rx: Arc::new(Mutex::new(Some(outbound_rx))),
        }
    }

    /// Spawn the background connection task. Idempotent; the second call is
    /// a logged no-op.
    pub async fn start(&self) {
        let Some(outbound_rx) = self.outbound_rx.lock().await.take() else {
            warn!("connection task already started");
            return;
        };
        let shared = self.shared.clone();
        let config = self.config.clone();
        tokio::spawn(run_connection_loop(shared, outbound_rx, config));
    }

    /// Stop the background task and drop the socket. The final state is
    /// `disconnected`.
    pub fn close(&self) {
        self.shared.cancel.cancel();
    }
}

#[async_trait]
impl RealtimeChannel for WsChannel {
    fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.shared.events_tx.subscribe()
    }

    fn status_changes(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.status_tx.subscribe()
    }

    async fn emit(&self, event: ClientEvent) -> Result<(), KasaError> {
        if !self.is_connected() {
            return Err(KasaError::NotConnected);
        }
        let frame = wire::encode_client_event(&event);
        self.shared
            .outbound_tx
            .send(frame)
            .await
            .map_err(|_| KasaError::channel("connection task is gone"))?;
        Ok(())
    }
}

async fn run_connection_loop(
    shared: Arc<Shared>,
    mut outbound_rx: mpsc::Receiver<String>,
    config: RealtimeConfig,
) {
    let initial = Duration::from_millis(config.reconnect_initial_ms);
    let max = Duration::from_millis(config.reconnect_max_ms);
    let mut backoff = initial;

    loop {
        if shared.cancel.is_cancelled() {
            break;
        }
        shared.set_state(ConnectionState::Connecting);

        match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((socket, _)) => {
                backoff = initial;
                // Frames queued while down would be stale; emit() guards on
                // is_connected, so anything left here lost its race.
                while outbound_rx.try_recv().is_ok() {}
                shared.set_state(ConnectionState::Connected);
                serve_socket(&shared, socket, &mut outbound_rx).await;
                shared.set_state(ConnectionState::Disconnected);
            }
            Err(e) => {
                warn!(error = %e, url = %config.url, "connect failed");
                shared.set_state(ConnectionState::Disconnected);
                tokio::select! {
                    _ = shared.cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(max);
            }
        }
    }
    shared.set_state(ConnectionState::Disconnected);
}

async fn serve_socket<S>(
    shared: &Shared,
    socket: tokio_tungstenite::WebSocketStream<S>,
    outbound_rx: &mut mpsc::Receiver<String>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => {
                let _ = sink.close().await;
                break;
            }
            frame = outbound_rx.recv() => {
                let Some(text) = frame else { break };
                if let Err(e) = sink.send(WsMessage::text(text)).await {
                    warn!(error = %e, "outbound frame failed, dropping connection");
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        match wire::decode_server_frame(text.as_str()) {
                            Ok(Some(event)) => {
                                // Send only fails with zero subscribers; fine.
                                let _ = shared.events_tx.send(event);
                            }
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "ignoring undecodable frame"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by tungstenite
                    Some(Err(e)) => {
                        warn!(error = %e, "socket read failed");
                        break;
                    }
                }
            }
        }
    }
}

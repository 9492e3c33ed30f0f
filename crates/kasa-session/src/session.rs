// SPDX-FileCopyrightText: 2026 Kasa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Chat Session Controller: one conversation's coordination surface.
//!
//! A [`ChatSession`] sits between a conversation view and the rest of the
//! engine. It serves history cache-first, sends optimistically with a
//! temporary id, reconciles the server echo back into the store, tracks the
//! peer's typing indicator with an auto-expiry, and throttles the automatic
//! read receipt for incoming peer messages. Everything the view needs to
//! render arrives through one [`SessionEvent`] stream.

use std::sync::Arc;
use std::time::Duration;

use kasa_config::model::ChatConfig;
use kasa_core::types::{ChatEvent, ClientEvent, Message};
use kasa_core::{KasaError, MessagingApi, RealtimeChannel};
use kasa_store::MessageStore;
use kasa_sync::SyncEngine;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State change pushed to the conversation view.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new message entered the conversation, locally authored or peer-sent.
    MessageAdded(Message),
    /// An optimistic record was replaced by its server-confirmed copy.
    MessageConfirmed { temp_id: String, message: Message },
    /// The given messages flipped to read.
    MessagesRead(Vec<String>),
    /// The peer's typing indicator changed.
    PeerTyping(bool),
}

/// Controller for one open conversation.
///
/// Cheap to construct; does no I/O until a method is called. The event loop
/// in [`run`](Self::run) must be spawned for realtime behavior, but the
/// request/response methods work without it.
pub struct ChatSession {
    conversation_id: String,
    local_user_id: String,
    store: Arc<MessageStore>,
    channel: Arc<dyn RealtimeChannel>,
    api: Arc<dyn MessagingApi>,
    sync: Arc<SyncEngine>,
    typing_timeout: Duration,
    read_throttle: Duration,
    events_tx: broadcast::Sender<SessionEvent>,
    peer_typing_tx: watch::Sender<bool>,
}

impl ChatSession {
    pub fn new(
        conversation_id: &str,
        local_user_id: &str,
        store: Arc<MessageStore>,
        channel: Arc<dyn RealtimeChannel>,
        api: Arc<dyn MessagingApi>,
        sync: Arc<SyncEngine>,
        config: &ChatConfig,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        let (peer_typing_tx, _) = watch::channel(false);
        Self {
            conversation_id: conversation_id.to_string(),
            local_user_id: local_user_id.to_string(),
            store,
            channel,
            api,
            sync,
            typing_timeout: Duration::from_millis(config.typing_timeout_ms),
            read_throttle: Duration::from_millis(config.read_receipt_throttle_ms),
            events_tx,
            peer_typing_tx,
        }
    }

    /// Stream of view-facing state changes.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Snapshot-style handle on the peer's typing indicator.
    pub fn peer_typing(&self) -> watch::Receiver<bool> {
        self.peer_typing_tx.subscribe()
    }

    /// Load the conversation history, cache-first.
    ///
    /// The store answers immediately regardless of network state; a
    /// successful server fetch is merged back into the cache and the merged
    /// view returned. A fetch failure degrades to the cached history rather
    /// than erroring.
    pub async fn load_history(&self) -> Result<Vec<Message>, KasaError> {
        let cached = self.store.get_by_conversation(&self.conversation_id).await?;
        match self.api.fetch_messages(&self.conversation_id).await {
            Ok(fetched) => {
                debug!(
                    conversation = %self.conversation_id,
                    cached = cached.len(),
                    fetched = fetched.len(),
                    "merging server history into cache"
                );
                self.store.insert_batch(fetched).await?;
                self.store.get_by_conversation(&self.conversation_id).await
            }
            Err(e) => {
                warn!(
                    conversation = %self.conversation_id,
                    error = %e,
                    "history fetch failed, serving cached copy"
                );
                Ok(cached)
            }
        }
    }

    /// Send a message, optimistically.
    ///
    /// The record is persisted as `pending` and surfaced to the view before
    /// any network attempt, so the send is never lost and the UI never
    /// waits. Exactly one delivery attempt follows: a socket emit when
    /// connected (the echo finishes the id swap), otherwise one HTTP POST
    /// that swaps the temporary record in place. On a failed attempt the
    /// record stays `pending` for the Sync Engine and the error is returned.
    pub async fn send(&self, content: &str) -> Result<Message, KasaError> {
        let msg = Message::outgoing(&self.conversation_id, &self.local_user_id, content);
        self.store.insert(&msg).await?;
        let _ = self.events_tx.send(SessionEvent::MessageAdded(msg.clone()));

        if self.channel.is_connected() {
            self.channel
                .emit(ClientEvent::Send {
                    conversation_id: msg.conversation_id.clone(),
                    content: msg.content.clone(),
                    kind: msg.kind,
                    temp_id: msg.id.clone(),
                })
                .await?;
            debug!(id = %msg.id, "message emitted, awaiting echo");
            Ok(msg)
        } else {
            let confirmed = self
                .api
                .send_message(&self.conversation_id, content, msg.kind)
                .await?;
            self.store.delete(&msg.id).await?;
            self.store.insert(&confirmed).await?;
            info!(temp_id = %msg.id, id = %confirmed.id, "offline send confirmed over HTTP");
            let _ = self.events_tx.send(SessionEvent::MessageConfirmed {
                temp_id: msg.id,
                message: confirmed.clone(),
            });
            Ok(confirmed)
        }
    }

    /// Mark every unread peer message in the conversation as read.
    ///
    /// Idempotent: when nothing is unread, no state changes and nothing goes
    /// out on the network. Otherwise the local flip happens first, then the
    /// server is notified over the socket when connected, over HTTP when not.
    pub async fn mark_as_read(&self) -> Result<(), KasaError> {
        let flipped = self
            .store
            .mark_all_read_for_conversation(&self.conversation_id, &self.local_user_id)
            .await?;
        if flipped.is_empty() {
            debug!(conversation = %self.conversation_id, "nothing unread");
            return Ok(());
        }
        let _ = self
            .events_tx
            .send(SessionEvent::MessagesRead(flipped.clone()));

        if self.channel.is_connected() {
            self.channel
                .emit(ClientEvent::Read {
                    conversation_id: self.conversation_id.clone(),
                    message_ids: flipped,
                })
                .await
        } else {
            self.api.mark_read(&self.conversation_id, &flipped).await
        }
    }

    /// Tell the peer we are typing. Silently a no-op while disconnected;
    /// typing state is ephemeral and never queued.
    pub async fn send_typing(&self, is_typing: bool) {
        if !self.channel.is_connected() {
            return;
        }
        let result = self
            .channel
            .emit(ClientEvent::Typing {
                conversation_id: self.conversation_id.clone(),
                is_typing,
            })
            .await;
        if let Err(e) = result {
            debug!(error = %e, "typing emit dropped");
        }
    }

    /// The realtime event loop. Spawn once per open session; returns when
    /// the token is cancelled or the channel shuts down.
    ///
    /// Handles incoming messages (echo reconciliation, duplicate-delivery
    /// suppression, the throttled automatic read receipt), peer typing with
    /// auto-expiry, remote read receipts, and one sync pass per
    /// `… -> connected` edge.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut events = self.channel.subscribe();
        let mut status = self.channel.status_changes();
        // Disconnected baseline: a transition landing between subscribe and
        // a snapshot would hide the first edge; a spare pass is a no-op.
        let mut was_connected = false;
        let mut typing_deadline: Option<Instant> = None;
        let mut read_due: Option<Instant> = None;

        loop {
            let typing_expiry = deadline_sleep(typing_deadline);
            let read_fire = deadline_sleep(read_due);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = typing_expiry => {
                    typing_deadline = None;
                    self.set_peer_typing(false);
                }
                _ = read_fire => {
                    read_due = None;
                    if let Err(e) = self.mark_as_read().await {
                        warn!(error = %e, "automatic read receipt failed");
                    }
                }
                event = events.recv() => match event {
                    Ok(event) => {
                        self.handle_event(event, &mut typing_deadline, &mut read_due)
                            .await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event stream lagged, some deliveries were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                next = status.recv() => match next {
                    Ok(state) => {
                        let connected = state == kasa_core::ConnectionState::Connected;
                        if connected && !was_connected {
                            info!(
                                conversation = %self.conversation_id,
                                "connectivity restored, replaying unsynced messages"
                            );
                            if let Err(e) = self.sync.sync_pending().await {
                                warn!(error = %e, "reconnect sync pass failed");
                            }
                        }
                        was_connected = connected;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        was_connected = self.channel.is_connected();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    async fn handle_event(
        &self,
        event: ChatEvent,
        typing_deadline: &mut Option<Instant>,
        read_due: &mut Option<Instant>,
    ) {
        match event {
            ChatEvent::MessageReceived { message, temp_id }
                if message.conversation_id == self.conversation_id =>
            {
                if let Err(e) = self.ingest_message(message, temp_id, read_due).await {
                    warn!(error = %e, "failed to persist incoming message");
                }
            }
            ChatEvent::Typing {
                conversation_id,
                user_id,
                is_typing,
            } if conversation_id == self.conversation_id && user_id != self.local_user_id => {
                if is_typing {
                    // Each typing event refreshes the expiry window.
                    *typing_deadline = Some(Instant::now() + self.typing_timeout);
                    self.set_peer_typing(true);
                } else {
                    *typing_deadline = None;
                    self.set_peer_typing(false);
                }
            }
            ChatEvent::Read {
                conversation_id,
                message_ids,
            } if conversation_id == self.conversation_id => {
                if let Err(e) = self.store.mark_read_by_ids(message_ids.clone()).await {
                    warn!(error = %e, "failed to apply remote read receipt");
                    return;
                }
                let _ = self.events_tx.send(SessionEvent::MessagesRead(message_ids));
            }
            // Traffic for other conversations on the shared socket.
            _ => {}
        }
    }

    /// Persist one incoming message, reconciling echoes and suppressing
    /// duplicate deliveries by server id.
    async fn ingest_message(
        &self,
        message: Message,
        temp_id: Option<String>,
        read_due: &mut Option<Instant>,
    ) -> Result<(), KasaError> {
        let existing = self.store.get_by_conversation(&self.conversation_id).await?;
        if existing.iter().any(|m| m.id == message.id) {
            debug!(id = %message.id, "duplicate delivery ignored");
            return Ok(());
        }

        let own_echo = temp_id
            .filter(|tid| existing.iter().any(|m| m.id == *tid))
            .map(|tid| {
                debug!(temp_id = %tid, id = %message.id, "echo reconciled");
                tid
            });
        if let Some(tid) = &own_echo {
            self.store.delete(tid).await?;
        }
        self.store.insert(&message).await?;

        match own_echo {
            Some(temp_id) => {
                let _ = self
                    .events_tx
                    .send(SessionEvent::MessageConfirmed { temp_id, message });
            }
            None => {
                let from_peer = message.sender_id != self.local_user_id;
                let _ = self.events_tx.send(SessionEvent::MessageAdded(message));
                // One receipt covers a whole burst; the first arrival arms
                // the timer and later ones ride along.
                if from_peer && read_due.is_none() {
                    *read_due = Some(Instant::now() + self.read_throttle);
                }
            }
        }
        Ok(())
    }

    fn set_peer_typing(&self, is_typing: bool) {
        let changed = self.peer_typing_tx.send_if_modified(|current| {
            if *current == is_typing {
                false
            } else {
                *current = is_typing;
                true
            }
        });
        if changed {
            let _ = self.events_tx.send(SessionEvent::PeerTyping(is_typing));
        }
    }
}

/// Sleep until the deadline, or forever when there is none.
async fn deadline_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasa_core::types::{MessageKind, SyncStatus};
    use kasa_test_utils::{MockApi, MockChannel};
    use tempfile::tempdir;

    const CONV: &str = "bk-1";
    const ME: &str = "customer-1";
    const PEER: &str = "provider-1";

    struct Harness {
        store: Arc<MessageStore>,
        channel: Arc<MockChannel>,
        api: Arc<MockApi>,
        session: Arc<ChatSession>,
        _dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.db");
        let store = Arc::new(MessageStore::open(path.to_str().unwrap()).await.unwrap());
        let channel = Arc::new(MockChannel::new());
        let api = Arc::new(MockApi::new());
        let sync = Arc::new(SyncEngine::new(
            store.clone(),
            channel.clone() as Arc<dyn RealtimeChannel>,
            api.clone() as Arc<dyn MessagingApi>,
        ));
        let session = Arc::new(ChatSession::new(
            CONV,
            ME,
            store.clone(),
            channel.clone() as Arc<dyn RealtimeChannel>,
            api.clone() as Arc<dyn MessagingApi>,
            sync,
            &ChatConfig::default(),
        ));
        Harness {
            store,
            channel,
            api,
            session,
            _dir: dir,
        }
    }

    fn server_msg(id: &str, sender: &str, content: &str, timestamp: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: CONV.to_string(),
            sender_id: sender.to_string(),
            receiver_id: Some(if sender == ME { PEER } else { ME }.to_string()),
            content: content.to_string(),
            kind: MessageKind::Text,
            is_read: false,
            created_at: timestamp.to_string(),
            sync_status: SyncStatus::Synced,
        }
    }

    /// Spawn the session event loop and give it a beat to subscribe.
    async fn spawn_loop(h: &Harness) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let cancel = CancellationToken::new();
        let handle = {
            let session = h.session.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { session.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        (cancel, handle)
    }

    #[tokio::test]
    async fn history_merges_server_truth_into_cache() {
        let h = harness().await;
        // A pending local message already in the cache.
        let local = Message::outgoing(CONV, ME, "queued while offline");
        h.store.insert(&local).await.unwrap();
        h.api
            .set_history(vec![server_msg(
                "srv-old",
                PEER,
                "earlier",
                "2026-01-01T00:00:01.000Z",
            )])
            .await;

        let history = h.session.load_history().await.unwrap();

        let ids: Vec<_> = history.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains(&"srv-old"), "server history merged in");
        assert!(
            ids.contains(&local.id.as_str()),
            "pending local message survives the merge"
        );
    }

    #[tokio::test]
    async fn history_fetch_failure_degrades_to_cache() {
        let h = harness().await;
        h.store
            .insert(&server_msg("srv-1", PEER, "hi", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        h.api.set_fetch_fails(true);

        let history = h.session.load_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "srv-1");
    }

    #[tokio::test]
    async fn offline_send_swaps_temp_record_on_http_success() {
        let h = harness().await;
        let mut events = h.session.events();

        let confirmed = h.session.send("see you at 9").await.unwrap();
        assert_eq!(confirmed.id, "srv-1");

        let stored = h.store.get_by_conversation(CONV).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "srv-1");
        assert!(!stored[0].has_temp_id());

        // View saw the optimistic add first, then the confirmation.
        match events.recv().await.unwrap() {
            SessionEvent::MessageAdded(m) => assert!(m.has_temp_id()),
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.unwrap() {
            SessionEvent::MessageConfirmed { temp_id, message } => {
                assert!(temp_id.starts_with("tmp-"));
                assert_eq!(message.id, "srv-1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_offline_send_stays_pending() {
        let h = harness().await;
        h.api.set_send_fails(true);

        let err = h.session.send("will not go out").await.unwrap_err();
        assert!(matches!(err, KasaError::Api { .. }));

        let stored = h.store.get_by_conversation(CONV).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].sync_status, SyncStatus::Pending);
        assert!(stored[0].has_temp_id(), "record kept for later replay");
        assert_eq!(h.api.sent().await.len(), 0, "only one attempt was made");
    }

    #[tokio::test]
    async fn connected_send_emits_and_echo_finishes_the_swap() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;

        let optimistic = h.session.send("on my way").await.unwrap();
        assert!(optimistic.has_temp_id());

        let emitted = h.channel.emitted().await;
        assert_eq!(emitted.len(), 1);
        let temp_id = match &emitted[0] {
            ClientEvent::Send { temp_id, .. } => temp_id.clone(),
            other => panic!("unexpected emit: {other:?}"),
        };
        assert_eq!(temp_id, optimistic.id);
        assert!(h.api.sent().await.is_empty(), "no HTTP call while connected");

        // Server echoes the send with the correlation token.
        let mut echo = server_msg("srv-9", ME, "on my way", "2026-01-01T00:00:05.000Z");
        echo.is_read = false;
        h.channel.push_event(ChatEvent::MessageReceived {
            message: echo,
            temp_id: Some(temp_id),
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = h.store.get_by_conversation(CONV).await.unwrap();
        assert_eq!(stored.len(), 1, "temp record replaced, not duplicated");
        assert_eq!(stored[0].id, "srv-9");
        assert_eq!(stored[0].sync_status, SyncStatus::Synced);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_delivery_is_ignored() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;
        let mut events = h.session.events();

        let msg = server_msg("srv-3", PEER, "hello?", "2026-01-01T00:00:01.000Z");
        h.channel.push_event(ChatEvent::MessageReceived {
            message: msg.clone(),
            temp_id: None,
        });
        h.channel.push_event(ChatEvent::MessageReceived {
            message: msg,
            temp_id: None,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = h.store.get_by_conversation(CONV).await.unwrap();
        assert_eq!(stored.len(), 1);

        // Exactly one MessageAdded reached the view.
        let mut added = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::MessageAdded(_)) {
                added += 1;
            }
        }
        assert_eq!(added, 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn events_for_other_conversations_are_ignored() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;

        let mut foreign = server_msg("srv-77", PEER, "wrong room", "2026-01-01T00:00:01.000Z");
        foreign.conversation_id = "bk-other".to_string();
        h.channel.push_event(ChatEvent::MessageReceived {
            message: foreign,
            temp_id: None,
        });
        h.channel.push_event(ChatEvent::Typing {
            conversation_id: "bk-other".to_string(),
            user_id: PEER.to_string(),
            is_typing: true,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(h.store.get_by_conversation(CONV).await.unwrap().is_empty());
        assert!(!*h.session.peer_typing().borrow());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn mark_as_read_with_nothing_unread_is_silent() {
        let h = harness().await;
        h.channel.set_connected(true);

        h.session.mark_as_read().await.unwrap();

        assert_eq!(h.channel.emitted_count().await, 0);
        assert!(h.api.read_calls().await.is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_flips_peer_messages_and_notifies() {
        let h = harness().await;
        h.store
            .insert(&server_msg("srv-1", PEER, "hi", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        // Own unread message must not be flipped or reported.
        h.store
            .insert(&server_msg("srv-2", ME, "hi back", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();

        // Disconnected: the receipt rides over HTTP.
        h.session.mark_as_read().await.unwrap();

        let read_calls = h.api.read_calls().await;
        assert_eq!(read_calls.len(), 1);
        assert_eq!(read_calls[0].1, vec!["srv-1".to_string()]);

        let stored = h.store.get_by_conversation(CONV).await.unwrap();
        let read_ids: Vec<_> = stored
            .iter()
            .filter(|m| m.is_read)
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(read_ids, ["srv-1"]);

        // Connected: a second unread message goes out as a socket emit.
        h.channel.set_connected(true);
        h.store
            .insert(&server_msg("srv-4", PEER, "still there?", "2026-01-01T00:00:04.000Z"))
            .await
            .unwrap();
        h.session.mark_as_read().await.unwrap();
        let emitted = h.channel.emitted().await;
        assert_eq!(emitted.len(), 1);
        assert!(matches!(&emitted[0], ClientEvent::Read { message_ids, .. }
            if message_ids == &vec!["srv-4".to_string()]));
    }

    #[tokio::test]
    async fn send_typing_is_a_no_op_while_disconnected() {
        let h = harness().await;
        h.session.send_typing(true).await;
        assert_eq!(h.channel.emitted_count().await, 0);

        h.channel.set_connected(true);
        h.session.send_typing(true).await;
        let emitted = h.channel.emitted().await;
        assert!(matches!(&emitted[0], ClientEvent::Typing { is_typing: true, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn peer_typing_expires_without_a_refresh() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;
        let typing = h.session.peer_typing();

        h.channel.push_event(ChatEvent::Typing {
            conversation_id: CONV.to_string(),
            user_id: PEER.to_string(),
            is_typing: true,
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(*typing.borrow());

        // A refresh inside the window extends it.
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        h.channel.push_event(ChatEvent::Typing {
            conversation_id: CONV.to_string(),
            user_id: PEER.to_string(),
            is_typing: true,
        });
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert!(*typing.borrow(), "refresh restarted the expiry window");

        // No further refresh: the indicator clears on its own.
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(!*typing.borrow());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_stop_clears_typing_immediately() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;
        let typing = h.session.peer_typing();

        h.channel.push_event(ChatEvent::Typing {
            conversation_id: CONV.to_string(),
            user_id: PEER.to_string(),
            is_typing: true,
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(*typing.borrow());

        h.channel.push_event(ChatEvent::Typing {
            conversation_id: CONV.to_string(),
            user_id: PEER.to_string(),
            is_typing: false,
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!*typing.borrow());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn incoming_burst_produces_one_throttled_read_receipt() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;

        for (i, content) in ["one", "two", "three"].iter().enumerate() {
            h.channel.push_event(ChatEvent::MessageReceived {
                message: server_msg(
                    &format!("srv-{i}"),
                    PEER,
                    content,
                    &format!("2026-01-01T00:00:0{i}.000Z"),
                ),
                temp_id: None,
            });
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        let receipts: Vec<_> = h
            .channel
            .emitted()
            .await
            .into_iter()
            .filter(|e| matches!(e, ClientEvent::Read { .. }))
            .collect();
        assert_eq!(receipts.len(), 1, "the burst collapsed into one receipt");
        match &receipts[0] {
            ClientEvent::Read { message_ids, .. } => {
                assert_eq!(message_ids.len(), 3, "the one receipt covers the burst")
            }
            other => panic!("unexpected emit: {other:?}"),
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn own_echo_does_not_trigger_a_read_receipt() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;

        let sent = h.session.send("mine").await.unwrap();
        h.channel.push_event(ChatEvent::MessageReceived {
            message: server_msg("srv-1", ME, "mine", "2026-01-01T00:00:01.000Z"),
            temp_id: Some(sent.id),
        });
        tokio::time::sleep(Duration::from_millis(700)).await;

        let receipts = h
            .channel
            .emitted()
            .await
            .into_iter()
            .filter(|e| matches!(e, ClientEvent::Read { .. }))
            .count();
        assert_eq!(receipts, 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn remote_read_receipt_flips_local_records() {
        let h = harness().await;
        h.channel.set_connected(true);
        let (cancel, handle) = spawn_loop(&h).await;

        let mut mine = server_msg("srv-5", ME, "did you see this?", "2026-01-01T00:00:01.000Z");
        mine.is_read = false;
        h.store.insert(&mine).await.unwrap();

        h.channel.push_event(ChatEvent::Read {
            conversation_id: CONV.to_string(),
            message_ids: vec!["srv-5".to_string()],
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = h.store.get_by_conversation(CONV).await.unwrap();
        assert!(stored[0].is_read);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn connected_event_racing_loop_startup_still_replays() {
        let h = harness().await;
        // Connectivity lands before the loop subscribes; the late-delivered
        // `connected` event is the only edge the loop will ever observe and
        // must trigger the replay.
        h.channel.set_connected(true);
        let queued = Message::outgoing(CONV, ME, "raced the event loop");
        h.store.insert(&queued).await.unwrap();

        let (cancel, handle) = spawn_loop(&h).await;
        h.channel.ping_status(kasa_core::ConnectionState::Connected);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let emitted = h.channel.emitted().await;
        assert!(
            emitted
                .iter()
                .any(|e| matches!(e, ClientEvent::Send { temp_id, .. } if *temp_id == queued.id)),
            "backlog must not strand until the next flap"
        );

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn reconnect_edge_replays_pending_messages() {
        let h = harness().await;
        let (cancel, handle) = spawn_loop(&h).await;

        let queued = Message::outgoing(CONV, ME, "sent in a tunnel");
        h.store.insert(&queued).await.unwrap();

        h.channel.set_connected(true);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let emitted = h.channel.emitted().await;
        assert!(
            emitted
                .iter()
                .any(|e| matches!(e, ClientEvent::Send { temp_id, .. } if *temp_id == queued.id)),
            "pending message was replayed on reconnect"
        );

        cancel.cancel();
        handle.await.unwrap();
    }
}

//! Per-session subscriber registry.
//!
//! At most one live subscriber per session id. `connect` registers the
//! channel and hands the receiver to the transport; registrations are
//! removed when a send discovers the receiver gone (transport completion,
//! timeout, or error all end up dropping it) or via an explicit
//! `disconnect`.

use crate::event::StreamEvent;
use mindloop_core::error::ChannelError;
use mindloop_core::message::SessionId;
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Concurrency-safe registry of per-session stream channels.
pub struct StreamBroadcaster {
    clients: RwLock<HashMap<SessionId, mpsc::Sender<StreamEvent>>>,
    capacity: usize,
}

impl StreamBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Capacity is the per-subscriber buffer; a full buffer applies
    /// backpressure to the sending run rather than dropping events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register the subscriber channel for a session and return the
    /// receiving end. The first event on the channel is the handshake.
    ///
    /// A second connect for the same session replaces the previous
    /// subscriber; the replaced receiver simply stops receiving events.
    pub async fn connect(&self, session_id: &SessionId) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);

        // The receiver is held by this function until returned, so the
        // handshake cannot fail on a fresh channel.
        let _ = tx.send(StreamEvent::connected()).await;

        let previous = self
            .clients
            .write()
            .await
            .insert(session_id.clone(), tx);
        if previous.is_some() {
            warn!(session_id = %session_id, "Replaced existing stream subscriber");
        } else {
            info!(session_id = %session_id, "Stream subscriber connected");
        }

        rx
    }

    /// Push an event to the session's subscriber.
    ///
    /// Fails hard when no subscriber is registered — delivery is not
    /// best-effort. A send that finds the receiver dropped removes the
    /// registration and fails as closed.
    pub async fn send(
        &self,
        session_id: &SessionId,
        event: StreamEvent,
    ) -> Result<(), ChannelError> {
        let sender = {
            let clients = self.clients.read().await;
            clients
                .get(session_id)
                .cloned()
                .ok_or_else(|| ChannelError::NotConnected(session_id.to_string()))?
        };

        if sender.send(event).await.is_err() {
            self.clients.write().await.remove(session_id);
            debug!(session_id = %session_id, "Removed dropped stream subscriber");
            return Err(ChannelError::Closed(session_id.to_string()));
        }

        Ok(())
    }

    /// Remove a session's subscriber, if any.
    pub async fn disconnect(&self, session_id: &SessionId) {
        if self.clients.write().await.remove(session_id).is_some() {
            info!(session_id = %session_id, "Stream subscriber disconnected");
        }
    }

    /// Whether a subscriber is currently registered for the session.
    pub async fn is_connected(&self, session_id: &SessionId) -> bool {
        self.clients.read().await.contains_key(session_id)
    }
}

impl Default for StreamBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StreamEventKind;

    #[tokio::test]
    async fn connect_sends_handshake_first() {
        let broadcaster = StreamBroadcaster::new();
        let session = SessionId::from("s1");

        let mut rx = broadcaster.connect(&session).await;
        let handshake = rx.recv().await.unwrap();
        assert_eq!(handshake.kind, StreamEventKind::Connected);
    }

    #[tokio::test]
    async fn send_delivers_to_subscriber() {
        let broadcaster = StreamBroadcaster::new();
        let session = SessionId::from("s1");

        let mut rx = broadcaster.connect(&session).await;
        rx.recv().await.unwrap(); // handshake

        broadcaster
            .send(&session, StreamEvent::content("chunk", "m1"))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, StreamEventKind::AiGeneratedContent);
        assert_eq!(event.payload.content, "chunk");
    }

    #[tokio::test]
    async fn send_without_subscriber_is_a_hard_failure() {
        let broadcaster = StreamBroadcaster::new();
        let session = SessionId::from("nobody-listening");

        let err = broadcaster
            .send(&session, StreamEvent::done())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConnected(_)));
    }

    #[tokio::test]
    async fn dropped_receiver_is_removed_on_next_send() {
        let broadcaster = StreamBroadcaster::new();
        let session = SessionId::from("s1");

        let rx = broadcaster.connect(&session).await;
        drop(rx);

        let err = broadcaster
            .send(&session, StreamEvent::done())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed(_)));
        assert!(!broadcaster.is_connected(&session).await);

        // Subsequent sends see no registration at all
        let err = broadcaster
            .send(&session, StreamEvent::done())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConnected(_)));
    }

    #[tokio::test]
    async fn reconnect_replaces_previous_subscriber() {
        let broadcaster = StreamBroadcaster::new();
        let session = SessionId::from("s1");

        let mut first = broadcaster.connect(&session).await;
        first.recv().await.unwrap(); // handshake

        let mut second = broadcaster.connect(&session).await;
        second.recv().await.unwrap(); // handshake

        broadcaster
            .send(&session, StreamEvent::content("late", "m1"))
            .await
            .unwrap();

        let event = second.recv().await.unwrap();
        assert_eq!(event.payload.content, "late");
        // First receiver's sender was replaced; nothing further arrives.
        assert!(first.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_removes_registration() {
        let broadcaster = StreamBroadcaster::new();
        let session = SessionId::from("s1");

        let _rx = broadcaster.connect(&session).await;
        assert!(broadcaster.is_connected(&session).await);

        broadcaster.disconnect(&session).await;
        assert!(!broadcaster.is_connected(&session).await);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let broadcaster = StreamBroadcaster::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");

        let mut rx_a = broadcaster.connect(&a).await;
        rx_a.recv().await.unwrap();

        // b has no subscriber; a is unaffected
        assert!(broadcaster.send(&b, StreamEvent::done()).await.is_err());
        broadcaster.send(&a, StreamEvent::done()).await.unwrap();
        assert_eq!(rx_a.recv().await.unwrap().kind, StreamEventKind::AiDone);
    }
}

//! Fans `pnr.fetched` events out to every attached streaming session.
//!
//! Each session owns an `mpsc::Sender<String>` the WebSocket handler drains
//! to write text frames; a background task reads the event bus and pushes
//! serialized events onto every session's channel. One broken or slow
//! session never blocks or fails another — a full channel just drops the
//! session.

use crate::event_bus::{EventBus, PnrFetchedEvent};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const SESSION_BUFFER: usize = 32;

pub struct BroadcastBridge {
    sessions: Arc<DashMap<Uuid, mpsc::Sender<String>>>,
}

impl BroadcastBridge {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Register a new session and return its id plus the receiving half the
    /// caller should drain onto the socket.
    pub fn attach(&self) -> (Uuid, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.sessions.insert(id, tx);
        tracing::debug!(session_id = %id, "session_attached");
        (id, rx)
    }

    pub fn detach(&self, session_id: Uuid) {
        self.sessions.remove(&session_id);
        tracing::debug!(session_id = %session_id, "session_detached");
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Serialize the event once and attempt delivery to every open session,
    /// dropping (and detaching) any session whose channel is full or closed.
    fn fan_out(&self, event: &PnrFetchedEvent) {
        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "event_serialize_failed");
                return;
            }
        };

        let mut dead = Vec::new();
        for entry in self.sessions.iter() {
            if entry.value().try_send(body.clone()).is_err() {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            self.sessions.remove(&id);
        }
    }

    /// Drive this bridge from an event bus subscription until the bus is
    /// dropped. Spawned once at startup as a background task.
    pub async fn run(self: Arc<Self>, bus: Arc<EventBus>, topic: &str) {
        let mut rx = bus.subscribe(topic);
        loop {
            match rx.recv().await {
                Ok(event) => self.fan_out(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "broadcast_bridge_lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

impl Default for BroadcastBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> PnrFetchedEvent {
        PnrFetchedEvent {
            pnr: "GHTW42".to_string(),
            status: "SUCCESS",
            timestamp: 1,
        }
    }

    #[tokio::test]
    async fn attached_session_receives_fanned_out_frame() {
        let bridge = BroadcastBridge::new();
        let (_, mut rx) = bridge.attach();
        bridge.fan_out(&sample_event());
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("GHTW42"));
    }

    #[tokio::test]
    async fn detached_session_is_skipped_without_affecting_others() {
        let bridge = BroadcastBridge::new();
        let (id_a, _rx_a_dropped) = bridge.attach();
        let (_id_b, mut rx_b) = bridge.attach();
        bridge.detach(id_a);

        bridge.fan_out(&sample_event());
        let frame = rx_b.recv().await.unwrap();
        assert!(frame.contains("GHTW42"));
        assert_eq!(bridge.session_count(), 1);
    }

    #[tokio::test]
    async fn full_session_channel_is_dropped_not_fatal() {
        let bridge = BroadcastBridge::new();
        let (id, rx) = bridge.attach();
        drop(rx);
        bridge.fan_out(&sample_event());
        assert!(bridge.sessions.get(&id).is_none());
    }
}

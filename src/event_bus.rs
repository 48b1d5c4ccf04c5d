//! Topic-addressable in-process pub/sub over `tokio::sync::broadcast`,
//! one channel per topic, bounded so a lagging subscriber drops old events
//! rather than stalling the publisher.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnrFetchedEvent {
    pub pnr: String,
    pub status: &'static str,
    pub timestamp: i64,
}

/// Per-topic broadcast channels, created lazily on first publish or subscribe.
pub struct EventBus {
    topics: DashMap<String, broadcast::Sender<PnrFetchedEvent>>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<PnrFetchedEvent> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Enqueue to all current subscribers of `topic`. A topic with no
    /// subscribers silently drops the event (`send` errors on zero receivers).
    pub fn publish(&self, topic: &str, event: PnrFetchedEvent) {
        let sender = self.sender_for(topic);
        if sender.send(event).is_err() {
            tracing::debug!(topic, "event_dropped_no_subscribers");
        }
    }

    /// A fresh receiver for `topic`; dropping it cancels interest.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<PnrFetchedEvent> {
        self.sender_for(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("pnr.fetched");
        bus.publish(
            "pnr.fetched",
            PnrFetchedEvent {
                pnr: "GHTW42".to_string(),
                status: "SUCCESS",
                timestamp: 1,
            },
        );
        let event = rx.recv().await.unwrap();
        assert_eq!(event.pnr, "GHTW42");
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new();
        let mut a = bus.subscribe("pnr.fetched");
        let mut b = bus.subscribe("pnr.fetched");
        bus.publish(
            "pnr.fetched",
            PnrFetchedEvent {
                pnr: "GHTW42".to_string(),
                status: "SUCCESS",
                timestamp: 1,
            },
        );
        assert_eq!(a.recv().await.unwrap().pnr, "GHTW42");
        assert_eq!(b.recv().await.unwrap().pnr, "GHTW42");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(
            "pnr.fetched",
            PnrFetchedEvent {
                pnr: "GHTW42".to_string(),
                status: "SUCCESS",
                timestamp: 1,
            },
        );
    }
}

//! Ordered multicast of canonical events.
//!
//! The bus has one writer (the cache) and any number of readers. Every
//! subscriber gets its own unbounded channel, so a slow reader never
//! causes events to be dropped or reordered for anyone else. Delivery
//! order is publish order.

use std::pin::Pin;
use std::task::{Context, Poll};

use file_types::LocalFileEvent;
use futures_util::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

struct Subscriber {
    id: Uuid,
    tx: mpsc::UnboundedSender<LocalFileEvent>,
}

/// Multicast channel for canonical events.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    closed: bool,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl EventBus {
    /// Create an open bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber that first receives `replay`, then every later event.
    ///
    /// The caller must hold whatever lock orders publishes while building
    /// `replay` and calling this, so nothing is missed or seen twice at the
    /// boundary. On a closed bus the stream yields `replay` and then ends.
    pub fn subscribe(&mut self, replay: Vec<LocalFileEvent>) -> FileEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        for event in replay {
            // Cannot fail: we still own the receiver.
            let _ = tx.send(event);
        }

        if self.closed {
            tracing::debug!("Subscriber {} joined a closed bus", id);
        } else {
            self.subscribers.push(Subscriber { id, tx });
            tracing::debug!(
                "Subscriber {} registered (total: {})",
                id,
                self.subscribers.len()
            );
        }

        FileEventStream { id, rx }
    }

    /// Deliver an event to every live subscriber, pruning dropped ones.
    pub fn publish(&mut self, event: &LocalFileEvent) {
        if self.closed {
            return;
        }
        self.subscribers.retain(|sub| match sub.tx.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Subscriber {} went away", sub.id);
                false
            }
        });
    }

    /// Stop delivering; every stream ends once drained.
    pub fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
    }

    /// Check if the bus has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of subscribers still registered.
    ///
    /// A subscriber that dropped its stream is only pruned on the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// A subscription to canonical events.
///
/// Yields the replay snapshot first, then live events, and ends when the
/// cache is disposed.
#[derive(Debug)]
pub struct FileEventStream {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<LocalFileEvent>,
}

impl FileEventStream {
    /// Identifier of this subscription (appears in logs).
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next event. `None` once the bus is closed and drained.
    pub async fn recv(&mut self) -> Option<LocalFileEvent> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<LocalFileEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain every queued event without waiting.
    pub fn drain(&mut self) -> Vec<LocalFileEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Stream for FileEventStream {
    type Item = LocalFileEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use file_types::FileVersion;

    fn open(path: &str) -> LocalFileEvent {
        LocalFileEvent::open(FileVersion::new(path, 0), "")
    }

    #[test]
    fn replay_comes_before_live_events() {
        let mut bus = EventBus::new();
        let mut stream = bus.subscribe(vec![open("/replayed")]);
        bus.publish(&open("/live"));

        assert_eq!(stream.drain(), vec![open("/replayed"), open("/live")]);
    }

    #[test]
    fn every_subscriber_sees_publish_order() {
        let mut bus = EventBus::new();
        let mut first = bus.subscribe(Vec::new());
        let mut second = bus.subscribe(Vec::new());

        for path in ["/a", "/b", "/c"] {
            bus.publish(&open(path));
        }

        let expected = vec![open("/a"), open("/b"), open("/c")];
        assert_eq!(first.drain(), expected);
        assert_eq!(second.drain(), expected);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe(Vec::new());
        drop(bus.subscribe(Vec::new()));
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&open("/a"));
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn close_ends_streams() {
        let mut bus = EventBus::new();
        let mut stream = bus.subscribe(Vec::new());
        bus.publish(&open("/a"));
        bus.close();
        bus.publish(&open("/b"));

        assert_eq!(stream.try_recv(), Some(open("/a")));
        assert_eq!(stream.try_recv(), None);
        assert!(bus.is_closed());
    }

    #[test]
    fn subscribing_to_closed_bus_yields_only_replay() {
        let mut bus = EventBus::new();
        bus.close();
        let mut stream = bus.subscribe(vec![open("/a")]);
        assert_eq!(stream.drain(), vec![open("/a")]);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn recv_returns_none_after_close() {
        let mut bus = EventBus::new();
        let mut stream = bus.subscribe(Vec::new());
        bus.close();
        assert_eq!(stream.recv().await, None);
    }
}

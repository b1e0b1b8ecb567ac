//! Notification broadcasting for live clients.
//!
//! The core emits a single event after every successful upload. How the
//! event reaches browsers (SSE, websockets, ...) is up to the subscriber.

use tokio::sync::broadcast;

/// Events published to live subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    /// Fresh data is in the object store; subscribers should re-fetch.
    ResultsUpdated,
}

impl FeedEvent {
    /// Event name on the wire.
    pub fn name(self) -> &'static str {
        match self {
            FeedEvent::ResultsUpdated => "requestUpdate",
        }
    }
}

/// Fans out feed events to any number of subscribers.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: broadcast::Sender<FeedEvent>,
}

impl NotificationBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event to all current subscribers.
    ///
    /// Returns how many subscribers received it.
    pub fn send(&self, event: FeedEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{event:?} to {count} subscribers");
                count
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
                0
            }
        }
    }

    /// Subscribe to receive notifications
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

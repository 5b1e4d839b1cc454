//! Event Bus - central pub/sub system for todone events
//!
//! The EventBus uses tokio broadcast channels to deliver events to all subscribers.
//! Components emit events, consumers (CLI, HTTP clients, tests) subscribe.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::TdEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Central event bus for todone activity
pub struct EventBus {
    tx: broadcast::Sender<TdEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped. A lagging
    /// subscriber loses the oldest events.
    pub fn emit(&self, event: TdEvent) {
        debug!(event_type = event.event_type(), task_id = ?event.task_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TdEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted(id: &str) -> TdEvent {
        TdEvent::TaskDeleted { task_id: id.to_string() }
    }

    #[test]
    fn test_event_bus_subscribe() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(deleted("t1"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.task_id(), Some("t1"));
        assert_eq!(event.event_type(), "TaskDeleted");
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(deleted("t1"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(deleted("t1"));

        assert_eq!(rx1.recv().await.unwrap(), deleted("t1"));
        assert_eq!(rx2.recv().await.unwrap(), deleted("t1"));
    }
}

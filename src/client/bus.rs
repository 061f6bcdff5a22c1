//! Publish/subscribe channel for decoded inbound envelopes.
//!
//! Every envelope the dispatcher handles is republished here after session
//! state has been updated. Subscribers run synchronously on the dispatching
//! context, in registration order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::identifiers::SubscriberId;
use crate::protocol::Envelope;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
pub type Subscriber = Arc<dyn Fn(&Envelope) + Send + Sync>;

// ============================================================================
// EventBus
// ============================================================================

/// Enumerable set of envelope subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriberId, Subscriber)>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber and returns its handle.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&Envelope) + Send + Sync + 'static,
    ) -> SubscriberId {
        let id = SubscriberId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber: Subscriber = Arc::new(subscriber);
        self.subscribers.write().push((id, subscriber));
        trace!(%id, "Subscriber added");
        id
    }

    /// Adds a subscriber that forwards envelopes into a channel.
    ///
    /// The subscriber stays registered after the receiver is dropped until
    /// [`unsubscribe`](Self::unsubscribe) is called with the returned id.
    pub fn channel(&self) -> (SubscriberId, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |envelope| {
            let _ = tx.send(envelope.clone());
        });
        (id, rx)
    }

    /// Removes a subscriber. Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    /// Handles of all current subscribers.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscribers.read().iter().map(|(id, _)| *id).collect()
    }

    /// Number of current subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Delivers an envelope to every subscriber.
    ///
    /// The lock is released before callbacks run, so a subscriber may
    /// subscribe or unsubscribe without deadlocking.
    pub fn publish(&self, envelope: &Envelope) {
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        for subscriber in snapshot {
            subscriber(envelope);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::protocol::msg_type;

    #[test]
    fn test_publish_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |_| seen.lock().push(tag));
        }

        bus.publish(&Envelope::with_msg(msg_type::PING));
        assert_eq!(*seen.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let first = bus.subscribe(|_| {});
        let second = bus.subscribe(|_| {});

        assert_eq!(bus.subscriber_ids(), vec![first, second]);
        assert!(bus.unsubscribe(first));
        assert!(!bus.unsubscribe(first));
        assert_eq!(bus.subscriber_ids(), vec![second]);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_channel_receives_envelopes() {
        let bus = EventBus::new();
        let (_, mut rx) = bus.channel();

        bus.publish(&Envelope::with_msg(msg_type::READY));
        let received = rx.try_recv().expect("envelope");
        assert_eq!(received.msg(), Some("ready"));
    }

    #[test]
    fn test_subscriber_can_unsubscribe_during_publish() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<SubscriberId>>> = Arc::new(Mutex::new(None));

        let bus_clone = Arc::clone(&bus);
        let slot_clone = Arc::clone(&slot);
        let id = bus.subscribe(move |_| {
            if let Some(id) = slot_clone.lock().take() {
                bus_clone.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        bus.publish(&Envelope::new());
        assert_eq!(bus.subscriber_count(), 0);
    }
}

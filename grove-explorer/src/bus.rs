use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use flume::{Receiver, Sender};

use crate::event::ExternalEvent;
use crate::sync::lock;

type Subscribers = Mutex<Vec<(u64, Sender<ExternalEvent>)>>;

/// Fan-out of host change notifications to every subscribed binder.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Arc<Subscribers>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber; dropping the subscription unregisters it.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = flume::unbounded();
        lock(&self.subscribers).push((id, sender));
        Subscription {
            id,
            receiver,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Deliver `event` to every subscriber, returning how many received it.
    pub fn publish(&self, event: ExternalEvent) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|(_, sender)| sender.send(event.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

/// Receiving end of an [`EventBus`] registration.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<ExternalEvent>,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Next event, or `None` once the bus is gone.
    pub async fn recv(&self) -> Option<ExternalEvent> {
        self.receiver.recv_async().await.ok()
    }

    pub fn try_recv(&self) -> Option<ExternalEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_two_subscribers_when_published_then_both_receive() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        let delivered = bus.publish(ExternalEvent::DiagnosticsChanged);

        assert_eq!(delivered, 2);
        assert_eq!(first.try_recv(), Some(ExternalEvent::DiagnosticsChanged));
        assert_eq!(second.try_recv(), Some(ExternalEvent::DiagnosticsChanged));
    }

    #[test]
    fn given_dropped_subscription_when_published_then_it_is_unregistered() {
        let bus = EventBus::new();
        let subscription = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(ExternalEvent::VcsChanged), 0);
    }

    #[tokio::test]
    async fn given_dropped_bus_when_receiving_then_stream_ends() {
        let bus = EventBus::new();
        let subscription = bus.subscribe();

        drop(bus);

        assert_eq!(subscription.recv().await, None);
    }
}

use super::{EventKind, RemoteEvent};
use crossbeam_channel::Sender;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Handle returned by `subscribe`, used to unsubscribe exactly that listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    events: Sender<RemoteEvent>,
}

/// Listener bookkeeping for `RealtimeClient` implementations.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Vec<Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, events: Sender<RemoteEvent>) -> SubscriptionId {
        let id = SubscriptionId::new();
        debug!("Subscribed {} to {}", id, kind.as_str());
        self.subscribers.push(Subscriber { id, kind, events });
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Send `event` to every listener of its kind.
    /// Listeners whose receiver is gone are dropped. Returns the number reached.
    pub fn dispatch(&mut self, event: &RemoteEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;

        self.subscribers.retain(|s| {
            if s.kind != kind {
                return true;
            }
            match s.events.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    debug!("Dropping closed subscriber {}", s.id);
                    false
                }
            }
        });

        delivered
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_dispatch_by_kind() {
        let mut registry = SubscriberRegistry::new();
        let (errors_tx, errors_rx) = unbounded();
        let (updates_tx, updates_rx) = unbounded();
        registry.subscribe(EventKind::Error, errors_tx);
        registry.subscribe(EventKind::ConversationInterrupted, updates_tx);

        let delivered = registry.dispatch(&RemoteEvent::Error {
            message: "boom".into(),
        });

        assert_eq!(delivered, 1);
        assert_eq!(errors_rx.try_recv().unwrap().kind(), EventKind::Error);
        assert!(updates_rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_once() {
        let mut registry = SubscriberRegistry::new();
        let (tx, rx) = unbounded();
        let id = registry.subscribe(EventKind::ConversationInterrupted, tx);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert_eq!(registry.dispatch(&RemoteEvent::ConversationInterrupted), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receivers_are_pruned() {
        let mut registry = SubscriberRegistry::new();
        let (tx, rx) = unbounded();
        registry.subscribe(EventKind::ConversationInterrupted, tx);
        drop(rx);

        assert_eq!(registry.dispatch(&RemoteEvent::ConversationInterrupted), 0);
        assert!(registry.is_empty());
    }
}

//! Typed publish/subscribe
//!
//! Each subscriber owns the receiving half of an unbounded channel. Dropping
//! the `Subscription` closes the channel and the bus forgets the subscriber
//! on the next publish, so no handler can outlive its owner.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

pub struct EventBus<T> {
    subscribers: Vec<UnboundedSender<T>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        Subscription { receiver: rx }
    }

    /// Deliver to every live subscriber. Returns how many received it.
    pub fn publish(&mut self, event: T) -> usize {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// Receiving end of a bus subscription
pub struct Subscription<T> {
    receiver: UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Next queued event without waiting
    pub fn try_next(&mut self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// All queued events
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next event; `None` once the bus is gone
    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let mut bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.publish(7u32), 2);
        bus.publish(8);
        assert_eq!(a.drain(), vec![7, 8]);
        assert_eq!(b.try_next(), Some(7));
    }

    #[test]
    fn test_dropped_subscription_unregisters() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        {
            let _gone = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish("ping"), 1);
        drop(keep);
        assert_eq!(bus.publish("pong"), 0);
    }

    #[tokio::test]
    async fn test_async_next() {
        let mut bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(String::from("hello"));
        assert_eq!(sub.next().await.as_deref(), Some("hello"));
        drop(bus);
        assert_eq!(sub.next().await, None);
    }
}

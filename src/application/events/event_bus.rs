//! Broadcast event bus
//!
//! Billing events fan out to every live subscriber. A subscriber that falls
//! more than `capacity` messages behind loses the oldest ones and resumes
//! from the earliest message still buffered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::events::{Event, EventMessage};

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for billing events. Clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrap `event` in an [`EventMessage`] and send it. Returns the number of
    /// subscribers that will see it.
    pub fn publish(&self, event: Event) -> usize {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        let customer_id = message.event.customer_id().map(String::from);
        let message_id = message.id.clone();

        metrics::counter!("billing_events_published_total", "event_type" => event_type)
            .increment(1);

        match self.sender.send(message) {
            Ok(count) => {
                debug!(event_type, %message_id, ?customer_id, subscribers = count, "Event published");
                count
            }
            Err(_) => {
                debug!(event_type, %message_id, ?customer_id, "Event dropped, no subscribers");
                0
            }
        }
    }

    /// New subscriber that sees every event published from now on.
    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        let total = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(total, "Billing event subscriber attached");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end handed out by [`EventBus::subscribe`]; dropping it
/// decrements the bus's subscriber count.
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Next message, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Billing event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let remaining = self.subscriber_count.fetch_sub(1, Ordering::SeqCst) - 1;
        info!(remaining, "Billing event subscriber detached");
    }
}

/// Event bus shared between the billing service and its listeners
pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

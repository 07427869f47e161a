//! Event fan-out over a tokio broadcast channel
//!
//! Publishing never blocks. With no subscribers the event is dropped;
//! a subscriber that falls behind by more than the channel capacity
//! misses the oldest events (lagged).

use grader_usecase::{EngineEvent, EventPublisher};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastPublisher {
    pub const DEFAULT_CAPACITY: usize = 1_024;

    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receiver for every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: EngineEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => debug!(event = name, receivers, "Published event"),
            Err(_) => debug!(event = name, "No subscribers, event dropped"),
        }
    }
}

//! Fan-out bus: every subscriber sees every event, in no particular order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use domain::TransferEvent;
use tokio::sync::broadcast;

use crate::error::PublishError;

/// Write/subscribe interface of the fan-out bus.
///
/// Subscribed consumers (fraud analysis, balance-settled notification,
/// audit trail) each receive every published event. The bus gives no
/// cross-consumer ordering; consumers must treat each event as
/// independently processable.
#[async_trait]
pub trait FanOutBus: Send + Sync {
    /// Delivers an event to every current subscriber.
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError>;

    /// Opens a new subscription. Only events published afterwards are seen.
    fn subscribe(&self) -> broadcast::Receiver<TransferEvent>;
}

/// In-memory fan-out bus over a tokio broadcast channel.
#[derive(Clone)]
pub struct InMemoryFanOutBus {
    sender: broadcast::Sender<TransferEvent>,
    fail: Arc<AtomicBool>,
}

impl InMemoryFanOutBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configures the bus to refuse writes.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryFanOutBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl FanOutBus for InMemoryFanOutBus {
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("fan-out bus refused write".into()));
        }
        // No subscribers is not a failure: the bus only triggers
        // eventually-consistent downstream work.
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.sender.subscribe()
    }
}

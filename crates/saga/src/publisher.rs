//! Dual-channel, best-effort publication of terminal transfer events.

use std::sync::Arc;

use domain::TransferEvent;
use messaging::{FanOutBus, OrderedLog};

/// Publishes one event to both delivery channels.
///
/// The two writes are independent and best-effort: failure of one does not
/// block the other, and neither failure rolls back the persisted transfer.
/// The authoritative record is the transfer row; the messages only trigger
/// eventually-consistent downstream processing. This is a deliberate
/// availability-over-consistency choice.
#[derive(Clone)]
pub struct TransferEventPublisher {
    log: Arc<dyn OrderedLog>,
    bus: Arc<dyn FanOutBus>,
}

impl TransferEventPublisher {
    /// Creates a publisher over the two channels.
    pub fn new(log: Arc<dyn OrderedLog>, bus: Arc<dyn FanOutBus>) -> Self {
        Self { log, bus }
    }

    /// Writes `event` to the ordered log and the fan-out bus.
    ///
    /// Never returns an error: each failed write is logged and counted.
    #[tracing::instrument(
        skip(self, event),
        fields(
            transaction_id = %event.transaction_id,
            correlation_id = %event.correlation_id,
            status = %event.status,
        )
    )]
    pub async fn publish(&self, event: &TransferEvent) {
        if let Err(error) = self.log.publish(event).await {
            metrics::counter!("publish_failures_total", "channel" => "ordered_log").increment(1);
            tracing::warn!(%error, "ordered-log publish failed");
        }

        if let Err(error) = self.bus.publish(event).await {
            metrics::counter!("publish_failures_total", "channel" => "fanout_bus").increment(1);
            tracing::warn!(%error, "fan-out publish failed");
        }

        metrics::counter!("transfer_events_published_total").increment(1);
    }
}

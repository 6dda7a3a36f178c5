//! Partitioned, key-ordered event log with manual acknowledgment.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::TransferEvent;
use tokio::sync::Notify;

use crate::error::PublishError;

/// Write side of the ordered log.
///
/// Messages are routed to a partition by transaction ID, so every message
/// of one transaction lands in the same partition in publish order.
#[async_trait]
pub trait OrderedLog: Send + Sync {
    /// Appends an event to its partition.
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError>;
}

/// A message handed to a consumer.
///
/// `attempt` counts deliveries of this message on this channel, starting
/// at 1. A message that was received but never acknowledged comes back with
/// a higher attempt count.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub event: TransferEvent,
    pub attempt: u32,
}

struct Partition {
    queue: Mutex<VecDeque<(TransferEvent, u32)>>,
    notify: Notify,
}

impl Partition {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

/// In-memory ordered log.
///
/// `new` hands out exactly one [`PartitionConsumer`] per partition; single
/// ownership of the read side is what preserves per-transaction processing
/// order.
#[derive(Clone)]
pub struct InMemoryOrderedLog {
    partitions: Vec<Arc<Partition>>,
    closed: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

impl InMemoryOrderedLog {
    /// Creates a log with the given partition count and returns its
    /// consumers, one per partition.
    pub fn new(partition_count: usize) -> (Self, Vec<PartitionConsumer>) {
        let partition_count = partition_count.max(1);
        let partitions: Vec<_> = (0..partition_count)
            .map(|_| Arc::new(Partition::new()))
            .collect();
        let closed = Arc::new(AtomicBool::new(false));

        let consumers = partitions
            .iter()
            .map(|partition| PartitionConsumer {
                partition: Arc::clone(partition),
                closed: Arc::clone(&closed),
            })
            .collect();

        let log = Self {
            partitions,
            closed,
            fail: Arc::new(AtomicBool::new(false)),
        };
        (log, consumers)
    }

    /// Configures the log to refuse writes. Publish failures must never
    /// affect the other channel or the persisted transfer.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Closes the log: consumers drain what is queued and then stop.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for partition in &self.partitions {
            partition.notify.notify_waiters();
        }
    }

    /// Returns the number of queued (un-acked) messages across partitions.
    pub fn depth(&self) -> usize {
        self.partitions
            .iter()
            .map(|p| p.queue.lock().expect("partition lock poisoned").len())
            .sum()
    }

    fn partition_for(&self, event: &TransferEvent) -> &Partition {
        let mut hasher = std::hash::DefaultHasher::new();
        event.transaction_id.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.partitions.len();
        &self.partitions[index]
    }
}

#[async_trait]
impl OrderedLog for InMemoryOrderedLog {
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("ordered log refused write".into()));
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("ordered log closed".into()));
        }

        let partition = self.partition_for(event);
        partition
            .queue
            .lock()
            .expect("partition lock poisoned")
            .push_back((event.clone(), 0));
        partition.notify.notify_one();
        Ok(())
    }
}

/// Read side of one partition.
///
/// `recv` hands out the head message without removing it; only `ack`
/// removes it. A consumer that processed a message but never acked it (or
/// crashed) sees the same message again — acknowledgment is manual and
/// happens strictly after the terminal outcome is recorded.
pub struct PartitionConsumer {
    partition: Arc<Partition>,
    closed: Arc<AtomicBool>,
}

impl PartitionConsumer {
    /// Waits for the head message of this partition. Returns `None` once
    /// the log is closed and the partition drained.
    pub async fn recv(&self) -> Option<Delivery> {
        loop {
            let notified = self.partition.notify.notified();
            {
                let mut queue = self.partition.queue.lock().expect("partition lock poisoned");
                if let Some((event, deliveries)) = queue.front_mut() {
                    *deliveries += 1;
                    return Some(Delivery {
                        event: event.clone(),
                        attempt: *deliveries,
                    });
                }
                if self.closed.load(Ordering::SeqCst) {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Acknowledges the head message, removing it from the partition.
    pub fn ack(&self) {
        let mut queue = self.partition.queue.lock().expect("partition lock poisoned");
        queue.pop_front();
    }

    /// Leaves the head message in place for redelivery.
    pub fn nack(&self) {
        self.partition.notify.notify_one();
    }
}

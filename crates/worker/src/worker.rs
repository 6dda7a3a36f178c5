//! The retry worker.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use common::CorrelationId;
use domain::{SettlementCode, TransferEvent};
use messaging::{DeadLetter, DeadLetterChannel, OrderedLog, PartitionConsumer};
use saga::{SettlementDecision, SettlementValidator};
use tokio::task::JoinHandle;

use crate::state::MessageState;

/// Worker tuning.
#[derive(Debug, Clone)]
pub struct RetryWorkerConfig {
    /// Retry budget per correlation ID. Exceeding it dead-letters the
    /// message.
    pub max_retries: u32,
}

impl Default for RetryWorkerConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

#[derive(Default)]
struct WorkerState {
    /// Correlation IDs that reached a terminal outcome. Redeliveries of
    /// these are acknowledged without side effects.
    done: HashSet<CorrelationId>,
    /// First failure time per correlation ID, for the dead-letter window.
    first_failures: HashMap<CorrelationId, DateTime<Utc>>,
}

/// Consumes the ordered log and re-submits settlement confirmations.
///
/// Retry eligibility is decided solely by the settlement code: transient
/// codes go back on the log with an incremented retry count, everything
/// else — and anything past the retry budget — goes to the dead-letter
/// channel with the full original event attached. One task per partition
/// preserves per-transaction processing order.
pub struct RetryWorker<V: SettlementValidator> {
    validator: V,
    log: Arc<dyn OrderedLog>,
    dead_letters: Arc<dyn DeadLetterChannel>,
    config: RetryWorkerConfig,
    state: Mutex<WorkerState>,
}

impl<V> RetryWorker<V>
where
    V: SettlementValidator + Send + Sync + 'static,
{
    /// Creates a worker over the given channels.
    pub fn new(
        validator: V,
        log: Arc<dyn OrderedLog>,
        dead_letters: Arc<dyn DeadLetterChannel>,
        config: RetryWorkerConfig,
    ) -> Self {
        Self {
            validator,
            log,
            dead_letters,
            config,
            state: Mutex::new(WorkerState::default()),
        }
    }

    /// Processes one event to a terminal state.
    #[tracing::instrument(
        skip(self, event),
        fields(
            transaction_id = %event.transaction_id,
            correlation_id = %event.correlation_id,
            retry_count = event.retry_count,
        )
    )]
    pub async fn process(&self, event: &TransferEvent) -> MessageState {
        metrics::counter!("worker_messages_processed").increment(1);

        // Idempotence under redelivery: a correlation ID that already
        // reached a terminal outcome runs no side effects again.
        if self
            .state
            .lock()
            .expect("worker state lock poisoned")
            .done
            .contains(&event.correlation_id)
        {
            tracing::debug!("correlation already terminal, skipping");
            return MessageState::Succeeded;
        }

        tracing::debug!(state = %MessageState::Processing, "confirming settlement");
        let decision = match self
            .validator
            .validate(
                &event.destination_key,
                event.amount,
                &event.origin_account.to_string(),
            )
            .await
        {
            Ok(decision) => decision,
            // A transport failure is transient by definition.
            Err(error) => {
                SettlementDecision::rejected(SettlementCode::Unavailable, error.to_string())
            }
        };

        if decision.approved {
            self.mark_done(event.correlation_id);
            metrics::counter!("worker_confirmations_succeeded").increment(1);
            tracing::info!("settlement confirmed");
            return MessageState::Succeeded;
        }

        if decision.code.is_retryable() && event.retry_count < self.config.max_retries {
            self.record_failure(event.correlation_id);
            let retry = event.with_retry();
            if let Err(error) = self.log.publish(&retry).await {
                // The log refused the retry copy; leave the original
                // un-acked so the channel redelivers it.
                tracing::warn!(%error, "could not schedule retry");
                metrics::counter!("worker_retry_publish_failures").increment(1);
                return MessageState::Processing;
            }
            metrics::counter!("worker_retries_scheduled").increment(1);
            tracing::info!(
                code = %decision.code,
                next_attempt = retry.retry_count,
                "transient failure, retry scheduled"
            );
            return MessageState::RetryScheduled;
        }

        // Non-retryable rejection, or budget exhausted: the dead letter is
        // the durable record of the terminal failure.
        let now = Utc::now();
        let first_failed_at = {
            let mut state = self.state.lock().expect("worker state lock poisoned");
            state
                .first_failures
                .remove(&event.correlation_id)
                .unwrap_or(now)
        };
        let letter = DeadLetter {
            event: event.clone(),
            terminal_code: decision.code,
            retry_count: event.retry_count,
            first_failed_at,
            last_failed_at: now,
        };
        if let Err(error) = self.dead_letters.push(letter).await {
            tracing::error!(%error, "dead-letter channel refused the message");
            metrics::counter!("worker_dead_letter_failures").increment(1);
            return MessageState::Processing;
        }

        self.mark_done(event.correlation_id);
        metrics::counter!("worker_dead_lettered").increment(1);
        tracing::warn!(code = %decision.code, "message dead-lettered");
        MessageState::DeadLettered
    }

    fn mark_done(&self, correlation_id: CorrelationId) {
        let mut state = self.state.lock().expect("worker state lock poisoned");
        state.done.insert(correlation_id);
        state.first_failures.remove(&correlation_id);
    }

    fn record_failure(&self, correlation_id: CorrelationId) {
        let mut state = self.state.lock().expect("worker state lock poisoned");
        state.first_failures.entry(correlation_id).or_insert_with(Utc::now);
    }

    /// Spawns one task per partition consumer.
    ///
    /// Each task acknowledges a message only after [`process`] returned a
    /// terminal state; a non-terminal return leaves the message for
    /// redelivery. Tasks end when the log closes and their partition
    /// drains.
    ///
    /// [`process`]: RetryWorker::process
    pub fn spawn(self: Arc<Self>, consumers: Vec<PartitionConsumer>) -> Vec<JoinHandle<()>> {
        consumers
            .into_iter()
            .map(|consumer| {
                let worker = Arc::clone(&self);
                tokio::spawn(async move {
                    while let Some(delivery) = consumer.recv().await {
                        let outcome = worker.process(&delivery.event).await;
                        if outcome.is_terminal() {
                            consumer.ack();
                        } else {
                            consumer.nack();
                        }
                    }
                })
            })
            .collect()
    }
}

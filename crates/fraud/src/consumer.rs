//! Fan-out consumer driving fraud analysis.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use common::TransactionId;
use domain::TransferEvent;
use tokio::sync::{Semaphore, broadcast};

use crate::analyzer::FraudAnalyzer;
use crate::notifier::{RegulatoryNotice, RegulatoryNotifier};
use crate::result::FraudAnalysisResult;
use crate::signals::RiskSignals;

/// Consumer tuning.
#[derive(Debug, Clone)]
pub struct FraudConsumerConfig {
    /// Maximum events analyzed concurrently.
    pub concurrency: usize,

    /// Institution identifier stamped on regulatory notices.
    pub institution: String,
}

impl Default for FraudConsumerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            institution: "NOVABANK".to_string(),
        }
    }
}

/// Consumes transfer events from the fan-out bus and scores them.
///
/// The bus gives no ordering and may redeliver, so every event is analyzed
/// independently; metrics and the regulatory notice fire only on first
/// sight of a transaction ID. The notice is fire-and-forget with respect
/// to the analysis result — a failed emission logs a compliance gap and
/// changes nothing else.
pub struct FraudConsumer<S: RiskSignals, N: RegulatoryNotifier> {
    analyzer: FraudAnalyzer<S>,
    notifier: Arc<N>,
    config: FraudConsumerConfig,
    seen: Mutex<HashSet<TransactionId>>,
}

impl<S, N> FraudConsumer<S, N>
where
    S: RiskSignals + Send + Sync + 'static,
    N: RegulatoryNotifier + 'static,
{
    /// Creates a consumer.
    pub fn new(analyzer: FraudAnalyzer<S>, notifier: Arc<N>, config: FraudConsumerConfig) -> Self {
        Self {
            analyzer,
            notifier,
            config,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Analyzes a single event and runs the first-sight side effects.
    #[tracing::instrument(
        skip(self, event),
        fields(
            transaction_id = %event.transaction_id,
            correlation_id = %event.correlation_id,
        )
    )]
    pub async fn handle(&self, event: &TransferEvent) -> FraudAnalysisResult {
        let result = self.analyzer.analyze(event);

        let first_sight = self
            .seen
            .lock()
            .expect("seen-set lock poisoned")
            .insert(event.transaction_id);

        if first_sight {
            metrics::counter!("fraud_transactions_analyzed").increment(1);
            if result.is_fraudulent {
                metrics::counter!("fraud_detected").increment(1);
            }

            if result.requires_regulatory_notice {
                self.send_notice(event).await;
            }
        }

        tracing::info!(
            risk_score = result.risk_score,
            decision = ?result.decision,
            factors = ?result.risk_factors,
            first_sight,
            "fraud analysis complete"
        );

        result
    }

    async fn send_notice(&self, event: &TransferEvent) {
        let notice = RegulatoryNotice {
            transaction_id: event.transaction_id,
            sender_document: event
                .sender_document
                .clone()
                .unwrap_or_else(|| "***".to_string()),
            amount: event.amount,
            currency: "BRL".to_string(),
            destination_key: event.destination_key.clone(),
            institution: self.config.institution.clone(),
            reason: "TRANSFER_ABOVE_REGULATORY_THRESHOLD".to_string(),
            notified_at: Utc::now(),
        };

        match self.notifier.notify(notice).await {
            Ok(()) => {
                metrics::counter!("regulatory_notices_sent").increment(1);
                tracing::info!(
                    transaction_id = %event.transaction_id,
                    amount = %event.amount,
                    "regulatory notice emitted"
                );
            }
            Err(error) => {
                // Compliance gap: must be visible to operators, but the
                // analysis outcome stands.
                metrics::counter!("regulatory_notice_failures").increment(1);
                tracing::error!(
                    %error,
                    transaction_id = %event.transaction_id,
                    "regulatory notice failed"
                );
            }
        }
    }

    /// Drives the consumer over a fan-out subscription until the bus
    /// closes. Analysis runs on a bounded pool so one slow event cannot
    /// starve the subscription.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<TransferEvent>) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        break;
                    };
                    let consumer = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        consumer.handle(&event).await;
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!("fraud_events_lagged").increment(skipped);
                    tracing::warn!(skipped, "fraud consumer fell behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AccountId;
    use domain::{Money, PixKey, Transfer, TransferDetails};

    use crate::notifier::InMemoryRegulatoryChannel;
    use crate::result::Decision;
    use crate::signals::FixedSignals;

    fn event_for(amount: Money) -> TransferEvent {
        let mut t = Transfer::initiate(AccountId::new(), PixKey::new("rui@example.com"), amount);
        t.resolve_destination(AccountId::new());
        t.begin_validation();
        t.complete(TransferDetails {
            sender_name: "Ana".into(),
            sender_document: "***.***.***-25".into(),
            receiver_name: "Rui".into(),
            receiver_bank: "NovaBank".into(),
            masked_key: "r****@example.com".into(),
        });
        TransferEvent::from_transfer(&t)
    }

    fn consumer() -> (
        Arc<FraudConsumer<FixedSignals, InMemoryRegulatoryChannel>>,
        Arc<InMemoryRegulatoryChannel>,
    ) {
        let channel = Arc::new(InMemoryRegulatoryChannel::new());
        let consumer = Arc::new(FraudConsumer::new(
            FraudAnalyzer::new(FixedSignals::none()),
            Arc::clone(&channel),
            FraudConsumerConfig::default(),
        ));
        (consumer, channel)
    }

    #[tokio::test]
    async fn regulatory_notice_fires_exactly_once_under_redelivery() {
        let (consumer, channel) = consumer();
        let event = event_for(Money::from_reais(60_000));

        let first = consumer.handle(&event).await;
        assert!(first.requires_regulatory_notice);

        // Redelivery: idempotent decision path, no second notice
        let second = consumer.handle(&event).await;
        assert!(second.requires_regulatory_notice);
        assert_eq!(second.decision, first.decision);

        assert_eq!(channel.len().await, 1);
        let notice = &channel.all().await[0];
        assert_eq!(notice.transaction_id, event.transaction_id);
        assert_eq!(notice.sender_document, "***.***.***-25");
        assert_eq!(notice.currency, "BRL");
        assert_eq!(notice.reason, "TRANSFER_ABOVE_REGULATORY_THRESHOLD");
    }

    #[tokio::test]
    async fn below_threshold_sends_no_notice() {
        let (consumer, channel) = consumer();
        consumer.handle(&event_for(Money::from_reais(4_999))).await;
        assert!(channel.is_empty().await);
    }

    #[tokio::test]
    async fn notice_failure_does_not_change_the_decision() {
        let (consumer, channel) = consumer();
        channel.set_fail(true);

        let result = consumer.handle(&event_for(Money::from_reais(60_000))).await;

        assert_eq!(result.decision, Decision::ManualReviewRegulatory);
        assert!(result.requires_regulatory_notice);
        assert!(channel.is_empty().await);
    }

    #[tokio::test]
    async fn run_consumes_from_a_fanout_subscription() {
        let (consumer, channel) = consumer();
        let bus = messaging::InMemoryFanOutBus::new(16);
        let receiver = bus.subscribe();
        let handle = tokio::spawn(Arc::clone(&consumer).run(receiver));

        use messaging::FanOutBus as _;
        bus.publish(&event_for(Money::from_reais(60_000)))
            .await
            .unwrap();

        // Wait for the notice to land, then close the bus
        for _ in 0..50 {
            if channel.len().await == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        drop(bus);
        handle.await.unwrap();

        assert_eq!(channel.len().await, 1);
    }
}

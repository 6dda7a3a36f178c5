//! The immutable transfer snapshot carried on the delivery channels.

use chrono::{DateTime, Utc};
use common::{AccountId, CorrelationId, TransactionId};
use serde::{Deserialize, Serialize};

use super::record::Transfer;
use super::state::TransferStatus;
use super::value_objects::{Money, PixKey};

/// Snapshot of a transfer at fan-out time.
///
/// The same payload shape travels on both channels: the ordered log (keyed
/// by `transaction_id`, read by the retry worker) and the fan-out bus (read
/// by fraud, notification and audit consumers). The `correlation_id` stays
/// constant across redeliveries and retries so consumers can deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub transaction_id: TransactionId,
    pub origin_account: AccountId,
    pub destination_account: Option<AccountId>,
    pub destination_key: PixKey,
    pub amount: Money,
    /// Masked sender document, when display metadata was attached.
    pub sender_document: Option<String>,
    pub correlation_id: CorrelationId,
    pub status: TransferStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl TransferEvent {
    /// Snapshots a terminal transfer with a fresh correlation ID.
    pub fn from_transfer(transfer: &Transfer) -> Self {
        Self {
            transaction_id: transfer.id,
            origin_account: transfer.origin_account,
            destination_account: transfer.destination_account,
            destination_key: transfer.destination_key.clone(),
            amount: transfer.amount,
            sender_document: transfer
                .details
                .as_ref()
                .map(|d| d.sender_document.clone()),
            correlation_id: CorrelationId::new(),
            status: transfer.status,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy scheduled for another attempt: same correlation ID,
    /// incremented retry count.
    pub fn with_retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_transfer() -> Transfer {
        let mut t = Transfer::initiate(
            AccountId::new(),
            PixKey::new("rui@example.com"),
            Money::from_reais(250),
        );
        t.resolve_destination(AccountId::new());
        t.begin_validation();
        t.complete(super::super::record::TransferDetails {
            sender_name: "Ana".into(),
            sender_document: "***.***.***-09".into(),
            receiver_name: "Rui".into(),
            receiver_bank: "NovaBank".into(),
            masked_key: "r****@example.com".into(),
        });
        t
    }

    #[test]
    fn test_snapshot_copies_transfer_fields() {
        let t = completed_transfer();
        let event = TransferEvent::from_transfer(&t);

        assert_eq!(event.transaction_id, t.id);
        assert_eq!(event.origin_account, t.origin_account);
        assert_eq!(event.destination_account, t.destination_account);
        assert_eq!(event.amount, t.amount);
        assert_eq!(event.status, TransferStatus::Completed);
        assert_eq!(event.retry_count, 0);
    }

    #[test]
    fn test_retry_keeps_correlation_id() {
        let event = TransferEvent::from_transfer(&completed_transfer());
        let retried = event.with_retry();

        assert_eq!(retried.correlation_id, event.correlation_id);
        assert_eq!(retried.transaction_id, event.transaction_id);
        assert_eq!(retried.retry_count, 1);
        assert_eq!(retried.with_retry().retry_count, 2);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let event = TransferEvent::from_transfer(&completed_transfer());
        let json = serde_json::to_string(&event).unwrap();
        let back: TransferEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}

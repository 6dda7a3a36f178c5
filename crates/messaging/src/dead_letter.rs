//! Dead-letter channel for messages that exhausted their retry budget.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{SettlementCode, TransferEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::PublishError;

/// A message that exhausted its retry budget.
///
/// Carries the full original event so the message can be manually replayed,
/// plus the terminal error and the failure window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub event: TransferEvent,
    pub terminal_code: SettlementCode,
    pub retry_count: u32,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
}

/// Terminal destination for undeliverable messages.
#[async_trait]
pub trait DeadLetterChannel: Send + Sync {
    /// Records a dead letter.
    async fn push(&self, letter: DeadLetter) -> Result<(), PublishError>;
}

/// In-memory dead-letter channel.
#[derive(Clone, Default)]
pub struct InMemoryDeadLetters {
    letters: Arc<RwLock<Vec<DeadLetter>>>,
}

impl InMemoryDeadLetters {
    /// Creates a new empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of dead letters.
    pub async fn len(&self) -> usize {
        self.letters.read().await.len()
    }

    /// Returns true when no message was dead-lettered.
    pub async fn is_empty(&self) -> bool {
        self.letters.read().await.is_empty()
    }

    /// Returns a copy of all dead letters.
    pub async fn all(&self) -> Vec<DeadLetter> {
        self.letters.read().await.clone()
    }

    /// Removes and returns all dead letters, e.g. for manual replay.
    pub async fn drain(&self) -> Vec<DeadLetter> {
        std::mem::take(&mut *self.letters.write().await)
    }
}

#[async_trait]
impl DeadLetterChannel for InMemoryDeadLetters {
    async fn push(&self, letter: DeadLetter) -> Result<(), PublishError> {
        self.letters.write().await.push(letter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AccountId;
    use domain::{Money, PixKey, Transfer};

    fn letter() -> DeadLetter {
        let mut t = Transfer::initiate(
            AccountId::new(),
            PixKey::new("rui@example.com"),
            Money::from_reais(10),
        );
        t.reject_external();
        let event = TransferEvent::from_transfer(&t);
        let now = Utc::now();
        DeadLetter {
            event,
            terminal_code: SettlementCode::Timeout,
            retry_count: 3,
            first_failed_at: now,
            last_failed_at: now,
        }
    }

    #[tokio::test]
    async fn push_and_drain() {
        let channel = InMemoryDeadLetters::new();
        let dead = letter();

        channel.push(dead.clone()).await.unwrap();
        assert_eq!(channel.len().await, 1);

        let drained = channel.drain().await;
        assert_eq!(drained, vec![dead]);
        assert!(channel.is_empty().await);
    }

    #[tokio::test]
    async fn dead_letter_serialization_keeps_the_original_event() {
        let dead = letter();
        let json = serde_json::to_string(&dead).unwrap();
        let back: DeadLetter = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event, dead.event);
        assert_eq!(back.terminal_code, SettlementCode::Timeout);
    }
}

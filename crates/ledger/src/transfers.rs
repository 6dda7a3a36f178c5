//! Append-only store for terminal transfer records.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::TransactionId;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use domain::Transfer;

use crate::error::{LedgerError, Result};

/// Trait for the transfer audit store.
///
/// Transfers are inserted exactly once, in a terminal state, and never
/// updated or deleted. A duplicate insert for one ID is an error.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Persists a terminal transfer record.
    async fn insert(&self, transfer: &Transfer) -> Result<()>;

    /// Fetches a persisted transfer by ID.
    async fn get(&self, id: TransactionId) -> Result<Option<Transfer>>;
}

/// In-memory transfer store for testing and default wiring.
#[derive(Clone, Default)]
pub struct InMemoryTransferStore {
    transfers: Arc<RwLock<HashMap<TransactionId, Transfer>>>,
}

impl InMemoryTransferStore {
    /// Creates a new empty transfer store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted transfers.
    pub async fn len(&self) -> usize {
        self.transfers.read().await.len()
    }

    /// Returns true when no transfer has been persisted.
    pub async fn is_empty(&self) -> bool {
        self.transfers.read().await.is_empty()
    }

    /// Returns a copy of all persisted transfers, in no particular order.
    pub async fn all(&self) -> Vec<Transfer> {
        self.transfers.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn insert(&self, transfer: &Transfer) -> Result<()> {
        let mut transfers = self.transfers.write().await;
        if transfers.contains_key(&transfer.id) {
            return Err(LedgerError::DuplicateTransfer(transfer.id));
        }
        transfers.insert(transfer.id, transfer.clone());
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transfer>> {
        Ok(self.transfers.read().await.get(&id).cloned())
    }
}

/// PostgreSQL-backed transfer store.
///
/// The record body is stored as JSONB next to the indexed identity columns;
/// the unique primary key enforces the append-only contract.
#[derive(Clone)]
pub struct PostgresTransferStore {
    pool: PgPool,
}

impl PostgresTransferStore {
    /// Creates a new PostgreSQL transfer store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransferStore for PostgresTransferStore {
    async fn insert(&self, transfer: &Transfer) -> Result<()> {
        let body = serde_json::to_value(transfer)?;

        sqlx::query(
            r#"
            INSERT INTO transfers (id, origin_account, status, started_at, body)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(transfer.id.as_uuid())
        .bind(transfer.origin_account.as_uuid())
        .bind(transfer.status.as_str())
        .bind(transfer.started_at)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("transfers_pkey")
            {
                return LedgerError::DuplicateTransfer(transfer.id);
            }
            LedgerError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transfer>> {
        let row = sqlx::query("SELECT body FROM transfers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let body: serde_json::Value = row.try_get("body")?;
            Ok(serde_json::from_value(body)?)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::AccountId;
    use domain::{Money, PixKey};

    fn terminal_transfer() -> Transfer {
        let mut t = Transfer::initiate(
            AccountId::new(),
            PixKey::new("rui@example.com"),
            Money::from_reais(42),
        );
        t.reject_external();
        t
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryTransferStore::new();
        let transfer = terminal_transfer();

        store.insert(&transfer).await.unwrap();
        let loaded = store.get(transfer.id).await.unwrap().unwrap();
        assert_eq!(loaded, transfer);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryTransferStore::new();
        let transfer = terminal_transfer();

        store.insert(&transfer).await.unwrap();
        let result = store.insert(&transfer).await;
        assert!(matches!(result, Err(LedgerError::DuplicateTransfer(_))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn missing_transfer_is_none() {
        let store = InMemoryTransferStore::new();
        assert!(store.get(TransactionId::new()).await.unwrap().is_none());
    }
}

//! Payment-key directory: resolves a key to its registered owner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::PixKey;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// The owner a payment key resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub user_id: UserId,
    pub name: String,
    pub document: String,
}

/// Trait for payment-key resolution.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Resolves a key to its registered owner, or `None` when unregistered.
    async fn resolve(&self, key: &PixKey) -> Result<Option<DirectoryEntry>>;
}

/// In-memory key directory for testing and default wiring.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    entries: Arc<RwLock<HashMap<PixKey, DirectoryEntry>>>,
}

impl InMemoryDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key for a user.
    pub async fn register(
        &self,
        key: PixKey,
        user_id: UserId,
        name: impl Into<String>,
        document: impl Into<String>,
    ) {
        self.entries.write().await.insert(
            key,
            DirectoryEntry {
                user_id,
                name: name.into(),
                document: document.into(),
            },
        );
    }
}

#[async_trait]
impl KeyDirectory for InMemoryDirectory {
    async fn resolve(&self, key: &PixKey) -> Result<Option<DirectoryEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

/// PostgreSQL-backed key directory.
#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    /// Creates a new PostgreSQL key directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyDirectory for PostgresDirectory {
    async fn resolve(&self, key: &PixKey) -> Result<Option<DirectoryEntry>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, owner_name, document
            FROM payment_keys
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            Ok::<_, sqlx::Error>(DirectoryEntry {
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                name: row.try_get("owner_name")?,
                document: row.try_get("document")?,
            })
        })
        .transpose()?)
    }
}

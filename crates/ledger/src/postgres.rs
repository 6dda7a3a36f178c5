use async_trait::async_trait;
use common::{AccountId, UserId};
use domain::Money;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::account::{Account, Version};
use crate::error::{LedgerError, Result};
use crate::store::Ledger;

/// PostgreSQL-backed ledger implementation.
///
/// The compare-and-set delta is a single conditional `UPDATE` keyed on the
/// row version; a miss is re-read to distinguish a lost race from an
/// insufficient balance.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_account(row: PgRow) -> Result<Account> {
        Ok(Account {
            id: AccountId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            owner_name: row.try_get("owner_name")?,
            document: row.try_get("document")?,
            bank: row.try_get("bank")?,
            balance: Money::from_cents(row.try_get("balance_cents")?),
            version: Version::new(row.try_get("version")?),
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, user_id, owner_name, document, bank, balance_cents, version";

#[async_trait]
impl Ledger for PostgresLedger {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn get_account_for_user(&self, user_id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_account).transpose()
    }

    async fn apply_delta(
        &self,
        id: AccountId,
        delta: Money,
        expected: Version,
    ) -> Result<Account> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + $2, version = version + 1
            WHERE id = $1 AND version = $3 AND balance_cents + $2 >= 0
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(delta.cents())
        .bind(expected.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Self::row_to_account(row);
        }

        // The conditional update missed; re-read to say why.
        let current = self
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))?;

        if current.version != expected {
            Err(LedgerError::VersionConflict {
                account_id: id,
                expected,
                actual: current.version,
            })
        } else {
            Err(LedgerError::InsufficientBalance {
                account_id: id,
                balance: current.balance,
                delta,
            })
        }
    }
}

/// Inserts an account row. Test and seed helper; account CRUD proper is
/// owned by a separate service.
pub async fn insert_account(pool: &PgPool, account: &Account) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO accounts (id, user_id, owner_name, document, bank, balance_cents, version)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(account.id.as_uuid())
    .bind(account.user_id.as_uuid())
    .bind(&account.owner_name)
    .bind(&account.document)
    .bind(&account.bank)
    .bind(account.balance.cents())
    .bind(account.version.as_i64())
    .execute(pool)
    .await?;

    Ok(())
}

/// Registers a payment key for a user. Test and seed helper.
pub async fn insert_payment_key(
    pool: &PgPool,
    key: &str,
    user_id: UserId,
    owner_name: &str,
    document: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payment_keys (key, user_id, owner_name, document)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(key)
    .bind(user_id.as_uuid())
    .bind(owner_name)
    .bind(document)
    .execute(pool)
    .await?;

    Ok(())
}

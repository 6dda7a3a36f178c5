//! Ledger error types.

use common::{AccountId, TransactionId};
use domain::Money;
use thiserror::Error;

use crate::account::Version;

/// Errors that can occur at the ledger boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No account exists with the given ID.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// The account's version moved between the read and the write.
    /// The caller should re-read and retry.
    #[error("version conflict on account {account_id}: expected {expected}, actual {actual}")]
    VersionConflict {
        account_id: AccountId,
        expected: Version,
        actual: Version,
    },

    /// Applying the delta would drive the balance negative.
    #[error("insufficient balance on account {account_id}: {balance} cannot absorb {delta}")]
    InsufficientBalance {
        account_id: AccountId,
        balance: Money,
        delta: Money,
    },

    /// A transfer with this ID was already persisted. Records are
    /// append-only; a second insert is always a caller bug.
    #[error("transfer {0} already persisted")]
    DuplicateTransfer(TransactionId),

    /// The ledger could not be reached or refused the write.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;

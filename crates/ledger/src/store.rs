use async_trait::async_trait;
use common::{AccountId, UserId};
use domain::Money;

use crate::account::{Account, Version};
use crate::error::Result;

/// Core trait for account ledger implementations.
///
/// Balance writes are compare-and-set: the caller passes the version it
/// read, and the write fails with `VersionConflict` if another writer got
/// there first. Two concurrent transfers debiting one account can therefore
/// never both pass a balance check against a stale read — one of them is
/// forced back around the read-check-write loop.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetches an account by ID.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Fetches the account owned by a user.
    async fn get_account_for_user(&self, user_id: UserId) -> Result<Option<Account>>;

    /// Applies a signed delta to an account's balance.
    ///
    /// Fails with `VersionConflict` when the row version no longer matches
    /// `expected`, and with `InsufficientBalance` when the delta would make
    /// the balance negative. Returns the updated account on success.
    async fn apply_delta(&self, id: AccountId, delta: Money, expected: Version)
    -> Result<Account>;
}

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use common::{AccountId, UserId};
use domain::Money;
use tokio::sync::RwLock;

use crate::account::{Account, Version};
use crate::error::{LedgerError, Result};
use crate::store::Ledger;

/// In-memory ledger implementation for testing and default wiring.
///
/// Provides the same compare-and-set contract as the PostgreSQL
/// implementation, plus fault injection for the credit-after-debit
/// failure path.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    failing_credits: Arc<AtomicU32>,
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account. Replaces any account with the same ID.
    pub async fn open_account(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }

    /// Configures the ledger to refuse credits (positive deltas). Used to
    /// exercise the compensating-reversal path; the reversal itself is a
    /// credit, so `fail_next_credits(1)` fails the destination credit while
    /// letting the reversal through.
    pub fn set_fail_on_credit(&self, fail: bool) {
        self.failing_credits
            .store(if fail { u32::MAX } else { 0 }, Ordering::SeqCst);
    }

    /// Refuses exactly the next `n` credit attempts.
    pub fn fail_next_credits(&self, n: u32) {
        self.failing_credits.store(n, Ordering::SeqCst);
    }

    /// Returns the current balance of an account, if it exists.
    pub async fn balance(&self, id: AccountId) -> Option<Money> {
        self.accounts.read().await.get(&id).map(|a| a.balance)
    }

    /// Returns the sum of all balances. Conservation checks compare this
    /// before and after a transfer.
    pub async fn total_balance(&self) -> Money {
        self.accounts
            .read()
            .await
            .values()
            .fold(Money::zero(), |acc, a| acc + a.balance)
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn get_account_for_user(&self, user_id: UserId) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn apply_delta(
        &self,
        id: AccountId,
        delta: Money,
        expected: Version,
    ) -> Result<Account> {
        if delta.is_positive()
            && self
                .failing_credits
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(LedgerError::Unavailable("credit refused".to_string()));
        }

        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&id)
            .ok_or(LedgerError::AccountNotFound(id))?;

        if account.version != expected {
            return Err(LedgerError::VersionConflict {
                account_id: id,
                expected,
                actual: account.version,
            });
        }

        let new_balance = account.balance + delta;
        if new_balance.is_negative() {
            return Err(LedgerError::InsufficientBalance {
                account_id: id,
                balance: account.balance,
                delta,
            });
        }

        account.balance = new_balance;
        account.version = account.version.next();
        Ok(account.clone())
    }
}

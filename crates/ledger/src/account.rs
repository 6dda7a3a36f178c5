//! The account row and its optimistic-concurrency version.

use common::{AccountId, UserId};
use domain::Money;
use serde::{Deserialize, Serialize};

/// Version number for an account row, used for optimistic concurrency
/// control on balance updates.
///
/// A freshly opened account is at version 1; every applied delta
/// increments it by 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a freshly opened account.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// A ledger account.
///
/// The balance is owned exclusively by the ledger; everyone else reads it
/// and requests compare-and-set deltas against the version they read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,

    /// Display name of the account holder.
    pub owner_name: String,

    /// Holder document (CPF). Only ever emitted in masked form.
    pub document: String,

    /// Institution label shown in transfer receipts.
    pub bank: String,

    /// Current balance. Never negative.
    pub balance: Money,

    /// Row version for compare-and-set updates.
    pub version: Version,
}

impl Account {
    /// Opens a new account at version 1.
    pub fn open(
        user_id: UserId,
        owner_name: impl Into<String>,
        document: impl Into<String>,
        bank: impl Into<String>,
        balance: Money,
    ) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            owner_name: owner_name.into(),
            document: document.into(),
            bank: bank.into(),
            balance,
            version: Version::first(),
        }
    }

    /// Returns the document with only the last two digits visible.
    pub fn masked_document(&self) -> String {
        let doc = self.document.as_str();
        if doc.len() < 4 || !doc.is_ascii() {
            return "***".to_string();
        }
        format!("***.***.***-{}", &doc[doc.len() - 2..])
    }
}

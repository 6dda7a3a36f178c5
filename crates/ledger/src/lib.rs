//! Account ledger for the instant-payment system.
//!
//! The ledger owns account balances exclusively: callers read accounts and
//! request compare-and-set deltas, and the store guarantees that no update
//! is lost under concurrent transfers on one account and that no balance
//! ever goes negative. The crate also hosts the payment-key directory and
//! the append-only transfer record store, each as a trait with in-memory
//! and PostgreSQL implementations.

mod account;
mod directory;
mod error;
mod memory;
mod postgres;
mod store;
mod transfers;

pub use account::{Account, Version};
pub use directory::{DirectoryEntry, InMemoryDirectory, KeyDirectory, PostgresDirectory};
pub use error::{LedgerError, Result};
pub use memory::InMemoryLedger;
pub use postgres::{PostgresLedger, insert_account, insert_payment_key};
pub use store::Ledger;
pub use transfers::{InMemoryTransferStore, PostgresTransferStore, TransferStore};

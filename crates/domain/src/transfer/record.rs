//! The transfer record — the unit of work of the saga.

use chrono::{DateTime, Utc};
use common::{AccountId, TransactionId};
use serde::{Deserialize, Serialize};

use super::state::TransferStatus;
use super::value_objects::{Money, PixKey};

/// Display metadata attached to a completed transfer.
///
/// Derived and non-authoritative; the ledger owns the real identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetails {
    /// Display name of the sender.
    pub sender_name: String,

    /// Masked document of the sender. The raw document never leaves the
    /// ledger.
    pub sender_document: String,

    /// Display name of the resolved receiver.
    pub receiver_name: String,

    /// Bank label of the receiving account.
    pub receiver_bank: String,

    /// Masked form of the destination key.
    pub masked_key: String,
}

/// A single transfer request as tracked by the orchestrator.
///
/// Created in memory at request time, mutated only by the orchestrator, and
/// persisted exactly once in a terminal state. Records are append-only: once
/// stored they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Generated identity, unique once persisted.
    pub id: TransactionId,

    /// The debited account.
    pub origin_account: AccountId,

    /// The credited account, once the destination key resolved.
    pub destination_account: Option<AccountId>,

    /// The destination key exactly as submitted.
    pub destination_key: PixKey,

    /// The transfer amount. Always strictly positive.
    pub amount: Money,

    /// When the request was accepted.
    pub started_at: DateTime<Utc>,

    /// When the transfer reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,

    /// Current lifecycle status.
    pub status: TransferStatus,

    /// Display metadata, set on completion.
    pub details: Option<TransferDetails>,

    /// Set when a financial effect remains unreversed after a failure and
    /// an operator must reconcile the balances.
    pub needs_compensation: bool,
}

impl Transfer {
    /// Creates a new transfer in `Initiated` status.
    pub fn initiate(origin_account: AccountId, destination_key: PixKey, amount: Money) -> Self {
        Self {
            id: TransactionId::new(),
            origin_account,
            destination_account: None,
            destination_key,
            amount,
            started_at: Utc::now(),
            completed_at: None,
            status: TransferStatus::Initiated,
            details: None,
            needs_compensation: false,
        }
    }

    /// Records the resolved destination account.
    pub fn resolve_destination(&mut self, account: AccountId) {
        self.destination_account = Some(account);
    }

    /// Marks the transfer as undergoing settlement validation.
    pub fn begin_validation(&mut self) {
        self.status = TransferStatus::Validating;
    }

    /// Terminal: the settlement authority rejected the transfer.
    pub fn reject_external(&mut self) {
        self.finish(TransferStatus::RejectedExternal);
    }

    /// Terminal: the origin balance did not cover the amount.
    pub fn insufficient_funds(&mut self) {
        self.finish(TransferStatus::InsufficientFunds);
    }

    /// Terminal: funds moved and display metadata is attached.
    pub fn complete(&mut self, details: TransferDetails) {
        self.details = Some(details);
        self.finish(TransferStatus::Completed);
    }

    /// Terminal: the transfer failed mid-flight. `needs_compensation` is set
    /// when a debit could not be reversed.
    pub fn fail(&mut self, needs_compensation: bool) {
        self.needs_compensation = needs_compensation;
        self.finish(TransferStatus::Failed);
    }

    /// Returns true once the transfer reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn finish(&mut self, status: TransferStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

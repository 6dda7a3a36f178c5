//! Transfer error taxonomy.

use common::{AccountId, TransactionId};
use domain::{Money, PixKey, SettlementCode};
use ledger::LedgerError;
use thiserror::Error;

/// Errors that can terminate a transfer.
///
/// Every variant carries a stable machine code (see [`TransferError::code`])
/// so callers can render errors without parsing messages, and so the
/// asynchronous worker can classify retry eligibility. None of the variants
/// leak internal detail into caller-facing bodies.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested amount was zero or negative.
    #[error("transfer amount must be positive, got {0}")]
    InvalidAmount(Money),

    /// The origin account does not exist.
    #[error("origin account not found: {0}")]
    OriginNotFound(AccountId),

    /// The destination key did not resolve to a user with an account.
    #[error("destination not found for key {}", .0.masked())]
    DestinationNotFound(PixKey),

    /// The origin balance did not cover the amount. Terminal, never retried.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    /// The settlement authority rejected the transfer. Terminal for the
    /// synchronous path; the worker may retry transient codes from the
    /// persisted record.
    #[error("settlement authority rejected the transfer ({code}): {message}")]
    ExternalRejected {
        code: SettlementCode,
        message: String,
    },

    /// Ledger failure before any balance mutation.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The destination credit failed after a successful debit.
    /// `compensated` tells whether the reversal credit restored the origin.
    #[error("credit failed after debit on transfer {transfer_id} (reversal applied: {compensated}): {reason}")]
    CreditFailed {
        transfer_id: TransactionId,
        compensated: bool,
        reason: String,
    },

    /// The terminal record could not be persisted. `after_effect`
    /// distinguishes a failure with funds already moved — which requires
    /// operator compensation — from one before any mutation.
    #[error("persistence failed for transfer {transfer_id} (after financial effect: {after_effect}): {reason}")]
    Persistence {
        transfer_id: TransactionId,
        after_effect: bool,
        reason: String,
    },

    /// The financial task could not be joined. Should not happen outside of
    /// runtime shutdown.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Returns the stable machine code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount(_) => "INVALID_AMOUNT",
            TransferError::OriginNotFound(_) => "ORIGIN_NOT_FOUND",
            TransferError::DestinationNotFound(_) => "DESTINATION_NOT_FOUND",
            TransferError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferError::ExternalRejected { .. } => "EXTERNAL_REJECTED",
            TransferError::Ledger(_) => "LEDGER_ERROR",
            TransferError::CreditFailed { .. } => "CREDIT_FAILED",
            TransferError::Persistence { .. } => "PERSISTENCE_FAILED",
            TransferError::Internal(_) => "INTERNAL",
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            TransferError::InvalidAmount(Money::zero()).code(),
            "INVALID_AMOUNT"
        );
        assert_eq!(
            TransferError::ExternalRejected {
                code: SettlementCode::LimitExceeded,
                message: "limit".into(),
            }
            .code(),
            "EXTERNAL_REJECTED"
        );
        assert_eq!(
            TransferError::Persistence {
                transfer_id: TransactionId::new(),
                after_effect: true,
                reason: "db down".into(),
            }
            .code(),
            "PERSISTENCE_FAILED"
        );
    }

    #[test]
    fn test_destination_message_masks_the_key() {
        let error = TransferError::DestinationNotFound(PixKey::new("ana@example.com"));
        let rendered = error.to_string();
        assert!(rendered.contains("a****@example.com"));
        assert!(!rendered.contains("ana@example.com"));
    }
}

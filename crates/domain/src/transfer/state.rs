//! Transfer status state machine.

use serde::{Deserialize, Serialize};

/// The status of a transfer in its lifecycle.
///
/// Status transitions:
/// ```text
/// Initiated ──► Validating ──┬──► Completed
///                            ├──► RejectedExternal
///                            ├──► InsufficientFunds
///                            └──► Failed
/// ```
///
/// A transfer is persisted exactly once, in a terminal status, and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// Created in memory, nothing validated yet.
    #[default]
    Initiated,

    /// Undergoing settlement-authority validation.
    Validating,

    /// The settlement authority rejected the transfer (terminal).
    RejectedExternal,

    /// The origin balance did not cover the amount (terminal).
    InsufficientFunds,

    /// Funds moved and the record was persisted (terminal).
    Completed,

    /// The transfer failed after validation started (terminal).
    Failed,
}

impl TransferStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::RejectedExternal
                | TransferStatus::InsufficientFunds
                | TransferStatus::Completed
                | TransferStatus::Failed
        )
    }

    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Initiated => "INITIATED",
            TransferStatus::Validating => "VALIDATING",
            TransferStatus::RejectedExternal => "REJECTED_EXTERNAL",
            TransferStatus::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_initiated() {
        assert_eq!(TransferStatus::default(), TransferStatus::Initiated);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TransferStatus::Initiated.is_terminal());
        assert!(!TransferStatus::Validating.is_terminal());
        assert!(TransferStatus::RejectedExternal.is_terminal());
        assert!(TransferStatus::InsufficientFunds.is_terminal());
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
    }

    #[test]
    fn test_display_matches_wire_form() {
        assert_eq!(TransferStatus::Initiated.to_string(), "INITIATED");
        assert_eq!(
            TransferStatus::RejectedExternal.to_string(),
            "REJECTED_EXTERNAL"
        );
        assert_eq!(TransferStatus::Completed.to_string(), "COMPLETED");
    }

    #[test]
    fn test_serialization_uses_wire_form() {
        let json = serde_json::to_string(&TransferStatus::InsufficientFunds).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_FUNDS\"");
        let back: TransferStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransferStatus::InsufficientFunds);
    }
}

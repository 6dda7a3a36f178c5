//! The settlement authority's machine-readable code vocabulary.

use serde::{Deserialize, Serialize};

/// Outcome code returned by the settlement authority.
///
/// Retry eligibility is a property of the code alone: transient transport
/// conditions may be retried by the asynchronous worker, explicit business
/// rejections may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementCode {
    /// The authority approved the transfer.
    Approved,

    /// Amount exceeds the authority's transaction limit.
    LimitExceeded,

    /// The destination key is malformed or unknown to the authority.
    InvalidKey,

    /// Authority-side funds check failed.
    InsufficientFunds,

    /// Destination account blocked (fraud suspicion).
    BlockedAccount,

    /// Destination document blocked by the revenue service.
    BlockedDocument,

    /// Destination account does not exist at the receiving institution.
    DestinationInvalid,

    /// Authority-side internal failure.
    InternalError,

    /// The validation did not answer within the request deadline.
    Timeout,

    /// The authority could not be reached.
    Unavailable,

    /// The authority is shedding load.
    RateLimited,
}

impl SettlementCode {
    /// Returns the wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementCode::Approved => "APPROVED",
            SettlementCode::LimitExceeded => "LIMIT_EXCEEDED",
            SettlementCode::InvalidKey => "INVALID_KEY",
            SettlementCode::InsufficientFunds => "INSUFFICIENT_FUNDS",
            SettlementCode::BlockedAccount => "BLOCKED_ACCOUNT",
            SettlementCode::BlockedDocument => "BLOCKED_DOCUMENT",
            SettlementCode::DestinationInvalid => "DESTINATION_INVALID",
            SettlementCode::InternalError => "INTERNAL_ERROR",
            SettlementCode::Timeout => "TIMEOUT",
            SettlementCode::Unavailable => "UNAVAILABLE",
            SettlementCode::RateLimited => "RATE_LIMITED",
        }
    }

    /// True for codes the retry worker may resubmit. Business rejections
    /// are final; only transient transport conditions qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SettlementCode::Timeout | SettlementCode::Unavailable | SettlementCode::RateLimited
        )
    }
}

impl std::fmt::Display for SettlementCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SettlementCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(SettlementCode::Approved),
            "LIMIT_EXCEEDED" => Ok(SettlementCode::LimitExceeded),
            "INVALID_KEY" => Ok(SettlementCode::InvalidKey),
            "INSUFFICIENT_FUNDS" => Ok(SettlementCode::InsufficientFunds),
            "BLOCKED_ACCOUNT" => Ok(SettlementCode::BlockedAccount),
            "BLOCKED_DOCUMENT" => Ok(SettlementCode::BlockedDocument),
            "DESTINATION_INVALID" => Ok(SettlementCode::DestinationInvalid),
            "INTERNAL_ERROR" => Ok(SettlementCode::InternalError),
            "TIMEOUT" => Ok(SettlementCode::Timeout),
            "UNAVAILABLE" => Ok(SettlementCode::Unavailable),
            "RATE_LIMITED" => Ok(SettlementCode::RateLimited),
            other => Err(UnknownCode(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized settlement code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown settlement code: {0}")]
pub struct UnknownCode(pub String);

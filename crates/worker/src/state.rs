//! Per-message processing state.

use serde::{Deserialize, Serialize};

/// The state of one consumed message.
///
/// State transitions:
/// ```text
/// Received ──► Processing ──┬──► Succeeded
///                           ├──► RetryScheduled
///                           └──► DeadLettered
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageState {
    /// Delivered, not yet processed.
    Received,

    /// Settlement confirmation in flight.
    Processing,

    /// Confirmed downstream (or already terminal for this correlation ID).
    Succeeded,

    /// Transient failure; a retry copy went back on the log.
    RetryScheduled,

    /// Routed to the dead-letter channel.
    DeadLettered,
}

impl MessageState {
    /// Returns true for states that end processing of the message.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageState::Succeeded | MessageState::RetryScheduled | MessageState::DeadLettered
        )
    }

    /// Returns the state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageState::Received => "RECEIVED",
            MessageState::Processing => "PROCESSING",
            MessageState::Succeeded => "SUCCEEDED",
            MessageState::RetryScheduled => "RETRY_SCHEDULED",
            MessageState::DeadLettered => "DEAD_LETTERED",
        }
    }
}

impl std::fmt::Display for MessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

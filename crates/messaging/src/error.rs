//! Messaging error types.

use thiserror::Error;

/// Errors raised by the delivery channels.
///
/// Publishes are best-effort at the call sites: a failed write to one
/// channel is logged and counted, never propagated into the transfer
/// outcome.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The channel refused or could not accept the message.
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Retry worker for settlement confirmation.
//!
//! Consumes the ordered log, re-invokes the settlement validator for each
//! transfer event, retries transient failures a bounded number of times,
//! and routes exhausted or non-retryable outcomes to the dead-letter
//! channel. Acknowledgment is manual and happens only after the terminal
//! outcome is recorded.

mod state;
mod worker;

pub use state::MessageState;
pub use worker::{RetryWorker, RetryWorkerConfig};

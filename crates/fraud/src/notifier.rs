//! Regulatory notification side channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::TransactionId;
use domain::{Money, PixKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Failure to reach the compliance channel.
///
/// Never changes the analysis decision; it is logged and counted as a
/// compliance gap.
#[derive(Debug, Clone, Error)]
#[error("regulatory channel unavailable: {0}")]
pub struct NotifyError(pub String);

/// Mandatory report for a transfer at or above the regulatory threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryNotice {
    pub transaction_id: TransactionId,

    /// Masked sender document; the raw document never reaches this channel.
    pub sender_document: String,

    pub amount: Money,
    pub currency: String,
    pub destination_key: PixKey,

    /// Reporting institution identifier.
    pub institution: String,

    /// Machine-readable reason code.
    pub reason: String,

    pub notified_at: DateTime<Utc>,
}

/// Destination of regulatory notices.
#[async_trait]
pub trait RegulatoryNotifier: Send + Sync {
    /// Emits one notice.
    async fn notify(&self, notice: RegulatoryNotice) -> Result<(), NotifyError>;
}

/// In-memory regulatory channel with fault injection.
#[derive(Clone, Default)]
pub struct InMemoryRegulatoryChannel {
    notices: Arc<RwLock<Vec<RegulatoryNotice>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryRegulatoryChannel {
    /// Creates a new empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the channel to refuse notices.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of recorded notices.
    pub async fn len(&self) -> usize {
        self.notices.read().await.len()
    }

    /// Returns true when no notice was recorded.
    pub async fn is_empty(&self) -> bool {
        self.notices.read().await.is_empty()
    }

    /// Returns a copy of all recorded notices.
    pub async fn all(&self) -> Vec<RegulatoryNotice> {
        self.notices.read().await.clone()
    }
}

#[async_trait]
impl RegulatoryNotifier for InMemoryRegulatoryChannel {
    async fn notify(&self, notice: RegulatoryNotice) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError("regulatory channel refused notice".into()));
        }
        self.notices.write().await.push(notice);
        Ok(())
    }
}

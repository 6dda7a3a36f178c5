//! Fraud analysis outcome types.

use chrono::{DateTime, Utc};
use common::TransactionId;
use serde::{Deserialize, Serialize};

/// A rule that contributed to the risk score, in trigger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFactor {
    RegulatoryThreshold,
    DestinationBlacklisted,
    CriticalAmount,
    HighAmount,
    UnusualHour,
    RoundAmount,
    NewRecipient,
    HighVelocity,
    DeviceAnomaly,
}

impl RiskFactor {
    /// Returns the factor tag as used in payloads and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskFactor::RegulatoryThreshold => "REGULATORY_THRESHOLD",
            RiskFactor::DestinationBlacklisted => "DESTINATION_BLACKLISTED",
            RiskFactor::CriticalAmount => "CRITICAL_AMOUNT",
            RiskFactor::HighAmount => "HIGH_AMOUNT",
            RiskFactor::UnusualHour => "UNUSUAL_HOUR",
            RiskFactor::RoundAmount => "ROUND_AMOUNT",
            RiskFactor::NewRecipient => "NEW_RECIPIENT",
            RiskFactor::HighVelocity => "HIGH_VELOCITY",
            RiskFactor::DeviceAnomaly => "DEVICE_ANOMALY",
        }
    }

    /// Returns the additive weight of the factor.
    pub fn weight(&self) -> f64 {
        match self {
            RiskFactor::RegulatoryThreshold => 0.30,
            RiskFactor::DestinationBlacklisted => 0.90,
            RiskFactor::CriticalAmount => 0.40,
            RiskFactor::HighAmount => 0.20,
            RiskFactor::UnusualHour => 0.15,
            RiskFactor::RoundAmount => 0.10,
            RiskFactor::NewRecipient => 0.10,
            RiskFactor::HighVelocity => 0.25,
            RiskFactor::DeviceAnomaly => 0.30,
        }
    }
}

impl std::fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// What happens to the transfer downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    ManualReview,
    ManualReviewRegulatory,
    Blocked,
}

/// The outcome of analyzing one transfer event.
///
/// Derived, never authoritative: redelivery of the same event is
/// re-analyzed, and only first-sight outcomes count in metrics and
/// notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAnalysisResult {
    pub transaction_id: TransactionId,
    pub is_fraudulent: bool,
    /// Risk score in `[0, 1]`.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    /// Triggered factors, in rule order.
    pub risk_factors: Vec<RiskFactor>,
    pub decision: Decision,
    pub requires_regulatory_notice: bool,
    pub analyzed_at: DateTime<Utc>,
}

impl FraudAnalysisResult {
    /// Returns true if the given factor triggered.
    pub fn has_factor(&self, factor: RiskFactor) -> bool {
        self.risk_factors.contains(&factor)
    }
}

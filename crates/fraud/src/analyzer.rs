//! Additive rule-based risk scoring.

use std::collections::HashSet;

use chrono::Timelike;
use chrono::Utc;
use domain::{Money, TransferEvent};

use crate::result::{Decision, FraudAnalysisResult, RiskFactor, RiskLevel};
use crate::signals::RiskSignals;

/// Thresholds and the destination blacklist.
#[derive(Debug, Clone)]
pub struct FraudConfig {
    /// Destination keys known to be bad.
    pub blacklist: HashSet<String>,

    /// At or above this amount the transfer must be reported to the
    /// compliance authority.
    pub regulatory_threshold: Money,

    /// Strictly above this amount (and below the regulatory threshold) the
    /// critical-amount rule fires.
    pub critical_amount: Money,

    /// At or above this amount the high-amount rule fires, when the
    /// critical rule did not.
    pub high_amount: Money,
}

impl Default for FraudConfig {
    fn default() -> Self {
        let blacklist = ["shadow@scam.example", "mule@scam.example", "burner@scam.example"]
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            blacklist,
            regulatory_threshold: Money::from_reais(50_000),
            critical_amount: Money::from_reais(10_000),
            high_amount: Money::from_reais(5_000),
        }
    }
}

/// Scores one transfer event against the rule set.
///
/// Rules are additive and the score is capped at 1.0. The unusual-hour
/// rule reads the event's creation timestamp, so a redelivered event lands
/// in the same hour bucket.
pub struct FraudAnalyzer<S: RiskSignals> {
    config: FraudConfig,
    signals: S,
}

impl<S: RiskSignals> FraudAnalyzer<S> {
    /// Creates an analyzer with the default thresholds.
    pub fn new(signals: S) -> Self {
        Self {
            config: FraudConfig::default(),
            signals,
        }
    }

    /// Creates an analyzer with custom thresholds.
    pub fn with_config(config: FraudConfig, signals: S) -> Self {
        Self { config, signals }
    }

    /// Analyzes a transfer event.
    pub fn analyze(&self, event: &TransferEvent) -> FraudAnalysisResult {
        let mut factors: Vec<RiskFactor> = Vec::new();
        let amount = event.amount;

        let requires_regulatory_notice = amount >= self.config.regulatory_threshold;
        if requires_regulatory_notice {
            factors.push(RiskFactor::RegulatoryThreshold);
        }

        if self.config.blacklist.contains(event.destination_key.as_str()) {
            factors.push(RiskFactor::DestinationBlacklisted);
        }

        if amount > self.config.critical_amount && amount < self.config.regulatory_threshold {
            factors.push(RiskFactor::CriticalAmount);
        } else if amount >= self.config.high_amount {
            factors.push(RiskFactor::HighAmount);
        }

        let hour = event.created_at.hour();
        if (2..5).contains(&hour) {
            factors.push(RiskFactor::UnusualHour);
        }

        if amount.is_round_thousands() {
            factors.push(RiskFactor::RoundAmount);
        }

        if self.signals.new_recipient(event) {
            factors.push(RiskFactor::NewRecipient);
        }
        if self.signals.high_velocity(event) {
            factors.push(RiskFactor::HighVelocity);
        }
        if self.signals.device_anomaly(event) {
            factors.push(RiskFactor::DeviceAnomaly);
        }

        let risk_score = factors
            .iter()
            .map(RiskFactor::weight)
            .sum::<f64>()
            .min(1.0);

        let (risk_level, decision, is_fraudulent) = if risk_score >= 0.8 {
            (RiskLevel::Critical, Decision::Blocked, true)
        } else if requires_regulatory_notice {
            (RiskLevel::High, Decision::ManualReviewRegulatory, false)
        } else if risk_score >= 0.5 {
            (RiskLevel::Medium, Decision::ManualReview, false)
        } else if risk_score >= 0.3 {
            (RiskLevel::Medium, Decision::Approved, false)
        } else {
            (RiskLevel::Low, Decision::Approved, false)
        };

        FraudAnalysisResult {
            transaction_id: event.transaction_id,
            is_fraudulent,
            risk_score,
            risk_level,
            risk_factors: factors,
            decision,
            requires_regulatory_notice,
            analyzed_at: Utc::now(),
        }
    }
}

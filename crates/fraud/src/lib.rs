//! Fraud analysis of transfer events.
//!
//! The analyzer applies an additive rule set over each event snapshot and
//! classifies the transfer; transfers at or above the regulatory threshold
//! additionally emit a notification to the compliance channel. The
//! probabilistic signals (new recipient, velocity, device anomaly) sit
//! behind a trait so production uses randomness and tests inject fixed
//! values.

mod analyzer;
mod consumer;
mod notifier;
mod result;
mod signals;

pub use analyzer::{FraudAnalyzer, FraudConfig};
pub use consumer::{FraudConsumer, FraudConsumerConfig};
pub use notifier::{InMemoryRegulatoryChannel, NotifyError, RegulatoryNotice, RegulatoryNotifier};
pub use result::{Decision, FraudAnalysisResult, RiskFactor, RiskLevel};
pub use signals::{FixedSignals, RandomSignals, RiskSignals};

//! Pluggable risk signals.
//!
//! New-recipient, velocity and device-anomaly detection need data sources
//! this system does not have, so production wiring uses probabilistic
//! stand-ins. They live behind a trait so conservation and idempotence
//! tests can inject deterministic values — randomness never leaks into
//! those properties.

use domain::TransferEvent;
use rand::Rng;

/// Sources of the probabilistic risk signals.
pub trait RiskSignals: Send + Sync {
    /// The destination was never paid by this origin before.
    fn new_recipient(&self, event: &TransferEvent) -> bool;

    /// The origin shows an unusual burst of transfers.
    fn high_velocity(&self, event: &TransferEvent) -> bool;

    /// The originating device looks unfamiliar.
    fn device_anomaly(&self, event: &TransferEvent) -> bool;
}

/// Probabilistic stand-ins with the documented trigger rates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSignals;

impl RandomSignals {
    pub fn new() -> Self {
        Self
    }
}

impl RiskSignals for RandomSignals {
    fn new_recipient(&self, _event: &TransferEvent) -> bool {
        rand::rng().random::<f64>() < 0.10
    }

    fn high_velocity(&self, _event: &TransferEvent) -> bool {
        rand::rng().random::<f64>() < 0.05
    }

    fn device_anomaly(&self, _event: &TransferEvent) -> bool {
        rand::rng().random::<f64>() < 0.03
    }
}

/// Deterministic signals for tests. The default triggers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSignals {
    pub new_recipient: bool,
    pub high_velocity: bool,
    pub device_anomaly: bool,
}

impl FixedSignals {
    /// Signals that never trigger.
    pub fn none() -> Self {
        Self::default()
    }
}

impl RiskSignals for FixedSignals {
    fn new_recipient(&self, _event: &TransferEvent) -> bool {
        self.new_recipient
    }

    fn high_velocity(&self, _event: &TransferEvent) -> bool {
        self.high_velocity
    }

    fn device_anomaly(&self, _event: &TransferEvent) -> bool {
        self.device_anomaly
    }
}

//! Settlement validator client: trait, bounded-timeout wrapper, simulated
//! authority and test doubles.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{KeyKind, Money, PixKey, SettlementCode};
use thiserror::Error;

/// Transport-level validator failure (the authority never answered with a
/// decision). Distinct from a rejection: rejections come back as
/// non-approved [`SettlementDecision`]s.
#[derive(Debug, Clone, Error)]
#[error("settlement validator transport error: {0}")]
pub struct ValidatorError(pub String);

/// The authority's answer for one validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementDecision {
    pub approved: bool,
    pub code: SettlementCode,
    pub message: String,
}

impl SettlementDecision {
    /// An approval.
    pub fn approved(message: impl Into<String>) -> Self {
        Self {
            approved: true,
            code: SettlementCode::Approved,
            message: message.into(),
        }
    }

    /// A rejection with a machine-readable code.
    pub fn rejected(code: SettlementCode, message: impl Into<String>) -> Self {
        Self {
            approved: false,
            code,
            message: message.into(),
        }
    }
}

/// Trait for settlement validation against the external authority.
#[async_trait]
pub trait SettlementValidator: Send + Sync {
    /// Asks the authority to approve `amount` to `key` on behalf of the
    /// sender identified by `sender_document`.
    async fn validate(
        &self,
        key: &PixKey,
        amount: Money,
        sender_document: &str,
    ) -> Result<SettlementDecision, ValidatorError>;
}

/// Wraps any validator with a bounded request timeout.
///
/// The authority may itself stall for seconds; when the deadline elapses
/// the caller gets a non-approved decision with code `TIMEOUT`, which the
/// retry worker treats as retry-eligible — unlike explicit rejections.
#[derive(Clone)]
pub struct TimedValidator<V> {
    inner: V,
    timeout: Duration,
}

impl<V> TimedValidator<V> {
    /// Bounds `inner` with the given deadline.
    pub fn new(inner: V, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<V: SettlementValidator> SettlementValidator for TimedValidator<V> {
    async fn validate(
        &self,
        key: &PixKey,
        amount: Money,
        sender_document: &str,
    ) -> Result<SettlementDecision, ValidatorError> {
        match tokio::time::timeout(self.timeout, self.inner.validate(key, amount, sender_document))
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => Ok(SettlementDecision::rejected(
                SettlementCode::Timeout,
                format!("no answer within {}ms", self.timeout.as_millis()),
            )),
        }
    }
}

/// Rule set of the simulated settlement authority.
///
/// Sentinel amounts mirror the demo environment of the real authority:
/// one amount stalls past any reasonable deadline, one fails internally,
/// and everything at or above the hard limit is refused.
#[derive(Debug, Clone)]
pub struct AuthorityRules {
    /// Amount that makes the authority stall before answering.
    pub stall_amount: Option<Money>,
    /// How long the stall lasts.
    pub stall_for: Duration,
    /// Amount that triggers an authority-side internal error.
    pub internal_error_amount: Option<Money>,
    /// Amounts at or above this limit are refused.
    pub limit: Money,
    /// Amount that fails the authority-side funds check.
    pub insufficient_amount: Option<Money>,
    /// Keys whose destination account is blocked.
    pub blocked_keys: HashSet<String>,
    /// Documents blocked by the revenue service.
    pub blocked_documents: HashSet<String>,
    /// Keys registered to no account at the receiving institution.
    pub unknown_keys: HashSet<String>,
}

impl Default for AuthorityRules {
    fn default() -> Self {
        Self {
            stall_amount: Some(Money::from_reais(100)),
            stall_for: Duration::from_secs(5),
            internal_error_amount: Some(Money::from_cents(66_666)),
            limit: Money::from_reais(100_000),
            insufficient_amount: None,
            blocked_keys: HashSet::new(),
            blocked_documents: HashSet::new(),
            unknown_keys: HashSet::new(),
        }
    }
}

/// In-process stand-in for the external settlement authority.
#[derive(Clone, Default)]
pub struct SimulatedAuthority {
    rules: Arc<AuthorityRules>,
}

impl SimulatedAuthority {
    /// Creates an authority with the default demo rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an authority with custom rules.
    pub fn with_rules(rules: AuthorityRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }
}

#[async_trait]
impl SettlementValidator for SimulatedAuthority {
    async fn validate(
        &self,
        key: &PixKey,
        amount: Money,
        sender_document: &str,
    ) -> Result<SettlementDecision, ValidatorError> {
        let rules = &self.rules;

        if rules.stall_amount == Some(amount) {
            tokio::time::sleep(rules.stall_for).await;
            return Ok(SettlementDecision::rejected(
                SettlementCode::Timeout,
                "authority stalled past its own deadline",
            ));
        }

        if rules.internal_error_amount == Some(amount) {
            return Ok(SettlementDecision::rejected(
                SettlementCode::InternalError,
                "authority internal failure",
            ));
        }

        if amount >= rules.limit {
            return Ok(SettlementDecision::rejected(
                SettlementCode::LimitExceeded,
                format!("amount exceeds the {} transaction limit", rules.limit),
            ));
        }

        if key.kind() == KeyKind::Other {
            return Ok(SettlementDecision::rejected(
                SettlementCode::InvalidKey,
                "key matches no registered format",
            ));
        }

        if rules.blocked_keys.contains(key.as_str()) {
            return Ok(SettlementDecision::rejected(
                SettlementCode::BlockedAccount,
                "destination account blocked on fraud suspicion",
            ));
        }

        if rules.blocked_documents.contains(sender_document)
            || rules.blocked_documents.contains(key.as_str())
        {
            return Ok(SettlementDecision::rejected(
                SettlementCode::BlockedDocument,
                "document blocked by the revenue service",
            ));
        }

        if rules.unknown_keys.contains(key.as_str()) {
            return Ok(SettlementDecision::rejected(
                SettlementCode::DestinationInvalid,
                "destination account not found at the receiving institution",
            ));
        }

        if rules.insufficient_amount == Some(amount) {
            return Ok(SettlementDecision::rejected(
                SettlementCode::InsufficientFunds,
                "authority-side funds check failed",
            ));
        }

        Ok(SettlementDecision::approved("validated"))
    }
}

/// Validator that approves everything. Counts invocations.
#[derive(Clone, Default)]
pub struct ApprovingValidator {
    calls: Arc<AtomicU32>,
}

impl ApprovingValidator {
    /// Creates a new approving validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many validations ran.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementValidator for ApprovingValidator {
    async fn validate(
        &self,
        _key: &PixKey,
        _amount: Money,
        _sender_document: &str,
    ) -> Result<SettlementDecision, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SettlementDecision::approved("ok"))
    }
}

/// Validator that rejects everything with a fixed code.
#[derive(Clone)]
pub struct RejectingValidator {
    code: SettlementCode,
    calls: Arc<AtomicU32>,
}

impl RejectingValidator {
    /// Creates a validator rejecting with `code`.
    pub fn new(code: SettlementCode) -> Self {
        Self {
            code,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns how many validations ran.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementValidator for RejectingValidator {
    async fn validate(
        &self,
        _key: &PixKey,
        _amount: Money,
        _sender_document: &str,
    ) -> Result<SettlementDecision, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SettlementDecision::rejected(self.code, "rejected"))
    }
}

/// Validator that rejects with a fixed code a number of times, then
/// approves. Used to exercise the worker's bounded-retry path.
#[derive(Clone)]
pub struct FlakyValidator {
    code: SettlementCode,
    remaining_failures: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
}

impl FlakyValidator {
    /// Creates a validator that fails `failures` times with `code`.
    pub fn new(code: SettlementCode, failures: u32) -> Self {
        Self {
            code,
            remaining_failures: Arc::new(AtomicU32::new(failures)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns how many validations ran.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettlementValidator for FlakyValidator {
    async fn validate(
        &self,
        _key: &PixKey,
        _amount: Money,
        _sender_document: &str,
    ) -> Result<SettlementDecision, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Ok(SettlementDecision::rejected(self.code, "transient failure"))
        } else {
            Ok(SettlementDecision::approved("recovered"))
        }
    }
}

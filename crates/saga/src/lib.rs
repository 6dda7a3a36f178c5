//! The transfer saga: orchestration of a single instant-payment request.
//!
//! The orchestrator sequences the synchronous steps — origin lookup, key
//! resolution, settlement validation, compare-and-set debit and credit,
//! terminal persistence — and then hands the completed transfer to the
//! event publisher, which dual-writes it to the ordered log and the
//! fan-out bus without ever failing the transfer.

pub mod error;
pub mod orchestrator;
pub mod publisher;
pub mod services;

pub use error::TransferError;
pub use orchestrator::TransferOrchestrator;
pub use publisher::TransferEventPublisher;
pub use services::settlement::{
    ApprovingValidator, AuthorityRules, FlakyValidator, RejectingValidator, SettlementDecision,
    SettlementValidator, SimulatedAuthority, TimedValidator, ValidatorError,
};

//! Domain layer for the instant-payment system.
//!
//! Holds the value objects (money, payment keys), the transfer record with
//! its terminal-status lifecycle, the immutable event snapshot carried on
//! the delivery channels, and the settlement authority's code vocabulary.

pub mod settlement;
pub mod transfer;

pub use settlement::SettlementCode;
pub use transfer::{
    KeyKind, Money, PixKey, Transfer, TransferDetails, TransferEvent, TransferStatus,
};

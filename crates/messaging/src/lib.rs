//! Delivery channels for transfer events.
//!
//! Two independent channels carry the same event payload:
//! an **ordered log** partitioned by transaction ID (all messages of one
//! transaction arrive in order, consumed with manual acknowledgment by the
//! retry worker) and a **fan-out bus** that delivers every event to every
//! subscriber with no ordering guarantee. Exhausted retries land on the
//! **dead-letter channel** with the full original event attached.

mod dead_letter;
mod error;
mod fanout;
mod ordered_log;

pub use dead_letter::{DeadLetter, DeadLetterChannel, InMemoryDeadLetters};
pub use error::PublishError;
pub use fanout::{FanOutBus, InMemoryFanOutBus};
pub use ordered_log::{Delivery, InMemoryOrderedLog, OrderedLog, PartitionConsumer};

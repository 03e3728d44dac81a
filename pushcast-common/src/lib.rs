//! Shared domain types and logging for pushcast.

pub mod contact;
pub mod error;
pub mod history;
pub mod logging;
pub mod message;
pub mod outcome;
pub mod stats;

pub use contact::{Contact, ContactFilter, DeviceToken};
pub use error::ValidationError;
pub use history::HistoryEvent;
pub use message::{BroadcastMessage, MessageContent, MessageId};
pub use outcome::DispatchOutcome;
pub use stats::MessageStats;
pub use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}

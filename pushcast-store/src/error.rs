//! Error types for the pushcast-store crate.

use pushcast_common::DeviceToken;
use thiserror::Error;

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No contact is registered under this device token.
    #[error("Contact not found: {0}")]
    NotFound(DeviceToken),

    /// The store refused a write because it is full.
    #[error("Store capacity exceeded: {len}/{capacity} entries")]
    CapacityExceeded { len: usize, capacity: usize },

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

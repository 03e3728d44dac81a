//! Typed error handling for broadcast delivery.
//!
//! Per-send failures are split into:
//! - Permanent failures (the device token is invalid) - don't retry, repair the registry
//! - Temporary failures (provider or network trouble) - retry with backoff
//! - System errors (the provider refused this send for other reasons) - don't retry
//!
//! [`BroadcastError`] covers the stages that make a whole broadcast fail.

use pushcast_common::ValidationError;
use pushcast_store::StoreError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Classification of a failed send to one target.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Permanent failure that should not be retried.
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// Temporary failure that can be retried with backoff.
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    /// System-level error (provider configuration, payload, internal errors).
    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// The target itself is unusable.
#[derive(Debug, Error)]
pub enum PermanentError {
    /// The provider rejected the token as malformed.
    #[error("Invalid device token: {0}")]
    InvalidToken(String),

    /// The device is no longer registered with the provider.
    #[error("Device unregistered: {0}")]
    Unregistered(String),
}

/// Failures unrelated to the target that may clear up on their own.
#[derive(Debug, Error)]
pub enum TemporaryError {
    /// Failed to reach the provider.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Provider is temporarily overloaded or failing.
    #[error("Provider busy: {0}")]
    ProviderBusy(String),

    /// Rate limit exceeded.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// No answer within the send timeout.
    #[error("Send timed out: {0}")]
    Timeout(String),
}

/// Failures that retrying would not fix and that say nothing about the target.
#[derive(Debug, Error)]
pub enum SystemError {
    /// The provider refused the payload.
    #[error("Payload rejected: {0}")]
    PayloadRejected(String),

    /// The provider refused our credentials or configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider cannot take traffic at all.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Other internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    /// Returns `true` if this error is temporary and should be retried.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns `true` if the target should be removed from the registry.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }
}

/// Convert a provider error into a delivery error.
///
/// - **Invalid/unregistered tokens and 410** → Permanent
/// - **404** → System (configuration). A bare 404 says nothing about the
///   token; a misconfigured endpoint answers 404 for every send.
/// - **429, 5xx and connection trouble** → Temporary
/// - **401/403** → System (configuration)
/// - **Other 4xx and refused payloads** → System (payload)
impl From<ProviderError> for DeliveryError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::InvalidToken(token) => {
                Self::Permanent(PermanentError::InvalidToken(token))
            }
            ProviderError::Unregistered(token) => {
                Self::Permanent(PermanentError::Unregistered(token))
            }

            ProviderError::Status { code: 410, message } => {
                Self::Permanent(PermanentError::Unregistered(format!("410 {message}")))
            }
            ProviderError::Status { code: 429, message } => {
                Self::Temporary(TemporaryError::RateLimited(format!("429 {message}")))
            }
            ProviderError::Status { code, message } if (500..600).contains(&code) => {
                Self::Temporary(TemporaryError::ProviderBusy(format!("{code} {message}")))
            }
            ProviderError::Status { code, message } if matches!(code, 401 | 403 | 404) => {
                Self::System(SystemError::Configuration(format!("{code} {message}")))
            }
            ProviderError::Status { code, message } if (400..500).contains(&code) => {
                Self::System(SystemError::PayloadRejected(format!("{code} {message}")))
            }
            ProviderError::Status { code, message } => Self::System(SystemError::Internal(
                format!("Unexpected provider response: {code} {message}"),
            )),

            ProviderError::PayloadRejected(msg) => {
                Self::System(SystemError::PayloadRejected(msg))
            }
            ProviderError::Io(e) => {
                Self::Temporary(TemporaryError::ConnectionFailed(format!("I/O error: {e}")))
            }
            ProviderError::ConnectionClosed => Self::Temporary(TemporaryError::ConnectionFailed(
                "Connection closed unexpectedly".to_string(),
            )),
            ProviderError::Unavailable(msg) => Self::Temporary(TemporaryError::ProviderBusy(msg)),
        }
    }
}

/// Failure of a stage that a broadcast cannot continue without.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The request was rejected before any work was done.
    #[error("Invalid broadcast request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// The recipients of the domain could not be read.
    #[error("Failed to resolve recipients of {domain}: {source}")]
    Resolve {
        domain: String,
        #[source]
        source: StoreError,
    },

    /// The fan-out could not run at all.
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DeliveryError),
}

impl BroadcastError {
    /// Returns `true` if the caller sent a bad request.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

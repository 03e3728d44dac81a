//! Push provider seam.
//!
//! The device-platform protocol lives behind [`PushProvider`]; the dispatcher
//! only needs to know whether a send succeeded and, if not, which class of
//! failure it was.

use std::sync::Arc;

use async_trait::async_trait;
use pushcast_common::{DeviceToken, MessageContent, outbound};
use serde::Deserialize;
use thiserror::Error;

/// Errors reported by a push provider for a single send.
///
/// These are converted into [`crate::DeliveryError`] to decide whether the
/// target is invalid, whether the send may be retried, or neither.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the token as malformed.
    #[error("Invalid device token: {0}")]
    InvalidToken(String),

    /// The token was valid once but the device is no longer registered.
    #[error("Device token unregistered: {0}")]
    Unregistered(String),

    /// The provider answered with a non-success status.
    #[error("Provider responded {code}: {message}")]
    Status { code: u16, message: String },

    /// The payload itself was refused (size, format).
    #[error("Payload rejected: {0}")]
    PayloadRejected(String),

    /// Network I/O failure talking to the provider.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The provider closed the connection before answering.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// The provider cannot take traffic at all right now.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Sends a notification to one device.
#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug {
    /// Deliver `content` to `target`. One call is one authoritative attempt.
    ///
    /// Only [`ProviderError::InvalidToken`], [`ProviderError::Unregistered`]
    /// and a 410 status remove `target` from the registry. Implementations
    /// should report a per-token "not found" as `Unregistered`; a bare 404
    /// status is treated as a misconfigured endpoint.
    async fn send(&self, content: &MessageContent, target: &DeviceToken)
    -> Result<(), ProviderError>;

    /// Whether the provider can accept traffic at all.
    ///
    /// Checked once before a fan-out starts; an error here fails the whole
    /// dispatch instead of producing one failure per target.
    async fn ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Dry-run provider that logs every send and reports success.
///
/// Lets the service run end to end without provider credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProvider;

#[async_trait]
impl PushProvider for LogProvider {
    async fn send(
        &self,
        content: &MessageContent,
        target: &DeviceToken,
    ) -> Result<(), ProviderError> {
        outbound!(
            level = INFO,
            device_token = %target,
            title = %content.title,
            link = ?content.on_click_link,
            "Dry-run push"
        );
        Ok(())
    }
}

/// Which push provider to send through
///
/// # Examples
///
/// ```ron
/// Pushcast (
///     provider: Log,
/// )
/// ```
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub enum ProviderConfig {
    /// Log notifications instead of sending them
    #[default]
    Log,
}

impl ProviderConfig {
    #[must_use]
    pub fn build(self) -> Arc<dyn PushProvider> {
        match self {
            Self::Log => Arc::new(LogProvider),
        }
    }
}

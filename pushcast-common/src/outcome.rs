//! Per-target result of a send attempt.

use crate::contact::DeviceToken;

/// Outcome of sending one message to one device token.
///
/// Outcomes only live for the duration of a broadcast. They are turned into
/// history events and statistics, never stored as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub device_token: DeviceToken,
    /// `false` when the provider reported the token itself as unusable
    pub is_valid_target: bool,
    pub is_success: bool,
    pub error_detail: Option<String>,
}

impl DispatchOutcome {
    /// The provider accepted the message for this target
    #[must_use]
    pub const fn delivered(device_token: DeviceToken) -> Self {
        Self {
            device_token,
            is_valid_target: true,
            is_success: true,
            error_detail: None,
        }
    }

    /// The target is permanently invalid and should be removed from the registry
    #[must_use]
    pub fn invalid_target(device_token: DeviceToken, detail: impl Into<String>) -> Self {
        Self {
            device_token,
            is_valid_target: false,
            is_success: false,
            error_detail: Some(detail.into()),
        }
    }

    /// Sending failed for a reason unrelated to the token's validity
    #[must_use]
    pub fn failed(device_token: DeviceToken, detail: impl Into<String>) -> Self {
        Self {
            device_token,
            is_valid_target: true,
            is_success: false,
            error_detail: Some(detail.into()),
        }
    }
}

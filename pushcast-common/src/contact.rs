//! Push recipients and the filters used to look them up.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, require};

/// Opaque identifier of a push-notification endpoint.
///
/// Backed by an `Arc<str>` so a token can be handed to every stage of a
/// broadcast without copying the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceToken(Arc<str>);

impl DeviceToken {
    #[must_use]
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceToken {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for DeviceToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A registered recipient.
///
/// The device token is the unique key: registering the same token twice
/// replaces the earlier registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub device_token: DeviceToken,
    pub domain: String,
    #[serde(default)]
    pub email: Option<String>,
    pub last_modified_at: DateTime<Utc>,
}

impl Contact {
    /// Create a contact stamped with the current time
    #[must_use]
    pub fn new(device_token: impl Into<DeviceToken>, domain: impl Into<String>) -> Self {
        Self {
            device_token: device_token.into(),
            domain: domain.into(),
            email: None,
            last_modified_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Check the fields required for registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the device token or the domain is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("device_token", self.device_token.as_str())?;
        require("domain", &self.domain)
    }
}

/// Criteria for listing contacts. The domain is mandatory, every other
/// criterion narrows the result further.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFilter {
    pub domain: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub modified_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_to: Option<DateTime<Utc>>,
}

impl ContactFilter {
    #[must_use]
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Returns `true` if `contact` satisfies every criterion of this filter.
    ///
    /// The modification window is inclusive on both ends.
    #[must_use]
    pub fn matches(&self, contact: &Contact) -> bool {
        contact.domain == self.domain
            && self
                .email
                .as_ref()
                .is_none_or(|email| contact.email.as_ref() == Some(email))
            && self
                .modified_from
                .is_none_or(|from| contact.last_modified_at >= from)
            && self
                .modified_to
                .is_none_or(|to| contact.last_modified_at <= to)
    }
}

//! Broadcast messages and their identity.

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, require};

/// Identifier of a broadcast
///
/// This is a ULID generated when the broadcast starts. ULIDs are
/// lexicographically sortable by creation time and collision-resistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId {
    id: ulid::Ulid,
}

impl MessageId {
    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Generate a new unique message ID
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s)
            .map(Self::new)
            .map_err(|_| ValidationError::InvalidMessageId(s.to_string()))
    }
}

/// What a caller asks to be broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub on_click_link: Option<String>,
}

impl MessageContent {
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            on_click_link: None,
        }
    }

    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.on_click_link = Some(link.into());
        self
    }

    /// # Errors
    ///
    /// Returns an error if the title or body is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("body", &self.body)
    }
}

/// A single broadcast, fixed at the moment it was requested.
///
/// Fields are private so nothing downstream can alter a message once its
/// identity has been handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    id: MessageId,
    domain: Arc<str>,
    content: MessageContent,
    created_at: DateTime<Utc>,
}

impl BroadcastMessage {
    /// Validate a request and stamp it with a fresh identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain, title or body is blank.
    pub fn new(domain: &str, content: MessageContent) -> Result<Self, ValidationError> {
        require("domain", domain)?;
        content.validate()?;

        Ok(Self {
            id: MessageId::generate(),
            domain: Arc::from(domain),
            content,
            created_at: Utc::now(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.content.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.content.body
    }

    #[must_use]
    pub fn on_click_link(&self) -> Option<&str> {
        self.content.on_click_link.as_deref()
    }

    #[must_use]
    pub const fn content(&self) -> &MessageContent {
        &self.content
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_parse() {
        let id = MessageId::generate();
        let parsed: MessageId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        assert_eq!(
            "not-a-ulid".parse::<MessageId>(),
            Err(ValidationError::InvalidMessageId("not-a-ulid".to_string()))
        );
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = BroadcastMessage::new("example.com", MessageContent::new("t", "b")).unwrap();
        let b = BroadcastMessage::new("example.com", MessageContent::new("t", "b")).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_broadcast_message_requires_fields() {
        assert_eq!(
            BroadcastMessage::new("", MessageContent::new("t", "b")),
            Err(ValidationError::MissingField("domain"))
        );
        assert_eq!(
            BroadcastMessage::new("example.com", MessageContent::new("", "b")),
            Err(ValidationError::MissingField("title"))
        );
        assert_eq!(
            BroadcastMessage::new("example.com", MessageContent::new("t", " ")),
            Err(ValidationError::MissingField("body"))
        );
    }

    #[test]
    fn test_broadcast_message_accessors() {
        let message = BroadcastMessage::new(
            "example.com",
            MessageContent::new("Title", "Body").with_link("https://example.com/promo"),
        )
        .unwrap();

        assert_eq!(message.domain(), "example.com");
        assert_eq!(message.title(), "Title");
        assert_eq!(message.body(), "Body");
        assert_eq!(message.on_click_link(), Some("https://example.com/promo"));
    }
}

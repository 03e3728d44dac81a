//! Storage seams used by the broadcast pipeline and the contact API.

use async_trait::async_trait;
use pushcast_common::{
    Contact, ContactFilter, DeviceToken, HistoryEvent, MessageId, MessageStats,
};

/// Registry of push recipients, keyed by device token.
#[async_trait]
pub trait ContactStore: Send + Sync + std::fmt::Debug {
    /// Insert a contact, replacing any contact registered under the same token
    ///
    /// Returns `true` if the token was not registered before.
    async fn upsert(&self, contact: Contact) -> crate::Result<bool>;

    /// All contacts matching `filter`, possibly none
    async fn find(&self, filter: &ContactFilter) -> crate::Result<Vec<Contact>>;

    /// Set the email of an existing contact
    ///
    /// Fails with [`crate::StoreError::NotFound`] if the token is unknown.
    async fn update_email(&self, device_token: &DeviceToken, email: String) -> crate::Result<()>;

    /// Remove every listed token in one operation.
    ///
    /// Unknown tokens are skipped. Returns the number of contacts actually removed.
    async fn delete_many(&self, device_tokens: &[DeviceToken]) -> crate::Result<u64>;

    /// Snapshot of the tokens currently registered for `domain`
    async fn device_tokens_by_domain(&self, domain: &str) -> crate::Result<Vec<DeviceToken>>;
}

/// Append-only log of per-target delivery events.
#[async_trait]
pub trait HistoryStore: Send + Sync + std::fmt::Debug {
    /// Append a batch of events. Nothing is deduplicated.
    async fn append_many(&self, events: Vec<HistoryEvent>) -> crate::Result<()>;

    /// Every event recorded for `message_id`, in append order
    async fn events_for(&self, message_id: MessageId) -> crate::Result<Vec<HistoryEvent>>;
}

/// Aggregate delivery statistics, one row per broadcast.
#[async_trait]
pub trait StatsStore: Send + Sync + std::fmt::Debug {
    async fn upsert(&self, stats: MessageStats) -> crate::Result<()>;

    async fn get(&self, message_id: MessageId) -> crate::Result<Option<MessageStats>>;
}

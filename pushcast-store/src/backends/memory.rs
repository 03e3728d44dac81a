use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use pushcast_common::{
    Contact, ContactFilter, DeviceToken, HistoryEvent, MessageId, MessageStats,
};

use crate::{
    StoreError,
    r#trait::{ContactStore, HistoryStore, StatsStore},
};

/// In-memory contact registry
///
/// Contacts are kept in a `HashMap` keyed by device token and protected by
/// an `RwLock`. An optional capacity limit makes registrations fail once the
/// registry is full instead of growing without bound.
///
/// # Performance
/// - Upsert: O(1)
/// - Find / tokens by domain: O(n), every contact is inspected
/// - Bulk delete: O(k) for k tokens, under a single write lock
#[derive(Debug, Clone, Default)]
pub struct MemoryContactStore {
    contacts: Arc<RwLock<HashMap<DeviceToken, Contact>>>,
    /// Maximum number of contacts to store (None = unlimited)
    capacity: Option<usize>,
}

impl MemoryContactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            contacts: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Number of registered contacts
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn upsert(&self, mut contact: Contact) -> crate::Result<bool> {
        contact.last_modified_at = Utc::now();

        let mut contacts = self.contacts.write()?;

        // Replacing an existing registration never counts against the capacity
        if let Some(capacity) = self.capacity
            && !contacts.contains_key(&contact.device_token)
            && contacts.len() >= capacity
        {
            return Err(StoreError::CapacityExceeded {
                len: contacts.len(),
                capacity,
            });
        }

        Ok(contacts
            .insert(contact.device_token.clone(), contact)
            .is_none())
    }

    async fn find(&self, filter: &ContactFilter) -> crate::Result<Vec<Contact>> {
        let mut found: Vec<_> = self
            .contacts
            .read()?
            .values()
            .filter(|contact| filter.matches(contact))
            .cloned()
            .collect();

        found.sort_by(|a, b| a.device_token.cmp(&b.device_token));
        Ok(found)
    }

    async fn update_email(&self, device_token: &DeviceToken, email: String) -> crate::Result<()> {
        let mut contacts = self.contacts.write()?;
        let contact = contacts
            .get_mut(device_token)
            .ok_or_else(|| StoreError::NotFound(device_token.clone()))?;

        contact.email = Some(email);
        contact.last_modified_at = Utc::now();
        Ok(())
    }

    async fn delete_many(&self, device_tokens: &[DeviceToken]) -> crate::Result<u64> {
        let mut contacts = self.contacts.write()?;
        let removed = device_tokens
            .iter()
            .filter(|token| contacts.remove(*token).is_some())
            .count();

        Ok(removed as u64)
    }

    async fn device_tokens_by_domain(&self, domain: &str) -> crate::Result<Vec<DeviceToken>> {
        let mut tokens: Vec<_> = self
            .contacts
            .read()?
            .values()
            .filter(|contact| contact.domain == domain)
            .map(|contact| contact.device_token.clone())
            .collect();

        tokens.sort();
        Ok(tokens)
    }
}

/// In-memory, append-only delivery history
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    events: Arc<RwLock<Vec<HistoryEvent>>>,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append_many(&self, events: Vec<HistoryEvent>) -> crate::Result<()> {
        self.events.write()?.extend(events);
        Ok(())
    }

    async fn events_for(&self, message_id: MessageId) -> crate::Result<Vec<HistoryEvent>> {
        Ok(self
            .events
            .read()?
            .iter()
            .filter(|event| event.message_id == message_id)
            .cloned()
            .collect())
    }
}

/// In-memory statistics store
#[derive(Debug, Clone, Default)]
pub struct MemoryStatsStore {
    stats: Arc<DashMap<MessageId, MessageStats>>,
}

impl MemoryStatsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn upsert(&self, stats: MessageStats) -> crate::Result<()> {
        self.stats.insert(stats.message_id, stats);
        Ok(())
    }

    async fn get(&self, message_id: MessageId) -> crate::Result<Option<MessageStats>> {
        Ok(self.stats.get(&message_id).map(|entry| entry.value().clone()))
    }
}

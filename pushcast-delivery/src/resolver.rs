use std::sync::Arc;

use async_trait::async_trait;
use pushcast_common::{DeviceToken, error::require};
use pushcast_store::ContactStore;

use crate::error::BroadcastError;

/// Finds the device tokens a broadcast to a domain should reach.
#[async_trait]
pub trait RecipientResolver: Send + Sync + std::fmt::Debug {
    /// Snapshot of the tokens registered for `domain`.
    ///
    /// A domain without contacts yields an empty list, not an error. Contacts
    /// registered or removed while the snapshot is taken may or may not be
    /// included.
    async fn resolve(&self, domain: &str) -> Result<Vec<DeviceToken>, BroadcastError>;
}

/// Resolves recipients straight from the contact registry.
#[derive(Debug, Clone)]
pub struct RegistryResolver {
    contacts: Arc<dyn ContactStore>,
}

impl RegistryResolver {
    #[must_use]
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl RecipientResolver for RegistryResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<DeviceToken>, BroadcastError> {
        require("domain", domain)?;

        let tokens = self
            .contacts
            .device_tokens_by_domain(domain)
            .await
            .map_err(|source| BroadcastError::Resolve {
                domain: domain.to_string(),
                source,
            })?;

        tracing::debug!(domain, recipients = tokens.len(), "Resolved recipients");
        Ok(tokens)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pushcast_common::Contact;
    use pushcast_store::TestContactStore;

    use super::*;

    #[tokio::test]
    async fn test_unknown_domain_resolves_to_nothing() {
        let resolver = RegistryResolver::new(Arc::new(TestContactStore::new()));
        assert!(resolver.resolve("nobody.example").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolves_only_requested_domain() {
        let store = TestContactStore::new();
        store.upsert(Contact::new("a", "d1")).await.unwrap();
        store.upsert(Contact::new("b", "d2")).await.unwrap();

        let resolver = RegistryResolver::new(Arc::new(store));
        assert_eq!(resolver.resolve("d1").await.unwrap(), vec![DeviceToken::from("a")]);
    }

    #[tokio::test]
    async fn test_blank_domain_is_rejected() {
        let resolver = RegistryResolver::new(Arc::new(TestContactStore::new()));
        let err = resolver.resolve("").await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let store = TestContactStore::new();
        store.fail_reads(true);

        let resolver = RegistryResolver::new(Arc::new(store));
        let err = resolver.resolve("d1").await.unwrap_err();
        assert!(matches!(err, BroadcastError::Resolve { ref domain, .. } if domain == "d1"));
    }
}

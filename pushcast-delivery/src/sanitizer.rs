use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use pushcast_common::{DeviceToken, DispatchOutcome};
use pushcast_store::{ContactStore, StoreError};

/// Removes recipients whose token the provider reported as invalid.
#[async_trait]
pub trait RegistrySanitizer: Send + Sync + std::fmt::Debug {
    /// Returns the number of contacts actually removed, which can be lower
    /// than the number of invalid outcomes.
    async fn sanitize(&self, outcomes: &[DispatchOutcome]) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone)]
pub struct StoreRegistrySanitizer {
    contacts: Arc<dyn ContactStore>,
}

impl StoreRegistrySanitizer {
    #[must_use]
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl RegistrySanitizer for StoreRegistrySanitizer {
    async fn sanitize(&self, outcomes: &[DispatchOutcome]) -> Result<u64, StoreError> {
        let invalid: Vec<DeviceToken> = outcomes
            .iter()
            .filter(|outcome| !outcome.is_valid_target)
            .map(|outcome| outcome.device_token.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if invalid.is_empty() {
            return Ok(0);
        }

        let removed = self.contacts.delete_many(&invalid).await?;

        tracing::info!(
            invalid = invalid.len(),
            removed,
            "Removed invalid device tokens from registry"
        );
        Ok(removed)
    }
}

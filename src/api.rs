//! In-process request surface
//!
//! Transport and authorization live in front of this; every call that
//! reaches [`PushContactApi`] is already allowed to run.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use pushcast_common::{
    Contact, ContactFilter, DeviceToken, MessageContent, MessageId, MessageStats,
    ValidationError, error::require,
};
use pushcast_delivery::{
    BroadcastError, BroadcastOrchestrator, DeferredConfig, DeferredFailure, DeferredSupervisor,
    DispatchConfig, PushProvider, Stages,
};
use pushcast_store::{ContactStore, StoreError, Stores};
use thiserror::Error;
use tokio::{runtime::Handle, sync::broadcast};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidRequest(#[from] ValidationError),

    #[error("Contact not found: {0}")]
    ContactNotFound(DeviceToken),

    #[error("Registry error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error("Shutting down, no new broadcasts are accepted")]
    ShuttingDown,
}

impl ApiError {
    /// Whether the caller is at fault, as opposed to the service
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidRequest(_) | Self::ContactNotFound(_) => true,
            Self::Broadcast(e) => e.is_client_error(),
            Self::Store(_) | Self::ShuttingDown => false,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(token) => Self::ContactNotFound(token),
            e => Self::Store(e),
        }
    }
}

/// Contact registry and broadcast operations.
#[derive(Debug)]
pub struct PushContactApi {
    contacts: Arc<dyn ContactStore>,
    orchestrator: Arc<BroadcastOrchestrator>,
    supervisor: DeferredSupervisor,
    accepting: AtomicBool,
}

impl PushContactApi {
    #[must_use]
    pub fn new(
        stores: &Stores,
        provider: Arc<dyn PushProvider>,
        delivery: DispatchConfig,
        deferred: DeferredConfig,
        runtime: Handle,
    ) -> Self {
        let orchestrator = Arc::new(BroadcastOrchestrator::new(Stages::from_stores(
            stores, provider, delivery,
        )));

        Self {
            contacts: Arc::clone(&stores.contacts),
            supervisor: DeferredSupervisor::new(Arc::clone(&orchestrator), deferred, runtime),
            orchestrator,
            accepting: AtomicBool::new(true),
        }
    }

    /// Register a contact, replacing any registration of the same token.
    ///
    /// Returns `true` if the token was not registered before.
    ///
    /// # Errors
    ///
    /// Returns an error if the contact is incomplete or the registry
    /// refuses it.
    pub async fn add_contact(&self, contact: Contact) -> Result<bool, ApiError> {
        contact.validate()?;

        let created = self.contacts.upsert(contact).await?;
        Ok(created)
    }

    /// Contacts matching `filter`. No match is an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is missing or the registry cannot be read.
    pub async fn list_contacts(&self, filter: &ContactFilter) -> Result<Vec<Contact>, ApiError> {
        require("domain", &filter.domain)?;

        Ok(self.contacts.find(filter).await?)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::ContactNotFound`] if the token is not registered.
    pub async fn update_contact_email(
        &self,
        device_token: &DeviceToken,
        email: impl Into<String>,
    ) -> Result<(), ApiError> {
        require("device_token", device_token.as_str())?;

        Ok(self.contacts.update_email(device_token, email.into()).await?)
    }

    /// Remove every listed token, returning how many were actually registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be written.
    pub async fn bulk_delete_contacts(&self, device_tokens: &[DeviceToken]) -> Result<u64, ApiError> {
        if device_tokens.is_empty() {
            return Ok(0);
        }

        Ok(self.contacts.delete_many(device_tokens).await?)
    }

    /// Send `content` to every contact of `domain` and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, the service is shutting
    /// down, or the recipients could not be resolved or the provider could
    /// not be used at all. Bookkeeping failures after the send are logged,
    /// not returned.
    pub async fn broadcast(
        &self,
        domain: &str,
        content: MessageContent,
    ) -> Result<MessageId, ApiError> {
        self.ensure_accepting()?;

        Ok(self.orchestrator.broadcast(domain, content).await?)
    }

    /// Accept a broadcast and run it in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the service is
    /// shutting down.
    pub fn broadcast_deferred(
        &self,
        domain: &str,
        content: MessageContent,
    ) -> Result<MessageId, ApiError> {
        self.ensure_accepting()?;

        Ok(self.supervisor.broadcast_deferred(domain, content)?)
    }

    fn ensure_accepting(&self) -> Result<(), ApiError> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ApiError::ShuttingDown)
        }
    }

    /// Delivery statistics of a broadcast sent to `domain`.
    ///
    /// `None` if the broadcast is unknown, belongs to another domain, or has
    /// not finished yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics cannot be read.
    pub async fn message_stats(
        &self,
        domain: &str,
        message_id: MessageId,
    ) -> Result<Option<MessageStats>, ApiError> {
        require("domain", domain)?;

        Ok(self.orchestrator.message_stats(domain, message_id).await?)
    }

    /// Failures of deferred broadcasts, as they happen
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeferredFailure> {
        self.supervisor.subscribe_failures()
    }

    /// Stop accepting broadcasts and wait for running ones.
    ///
    /// Returns `true` if every deferred broadcast finished in time.
    pub async fn shutdown(&self) -> bool {
        self.accepting.store(false, Ordering::SeqCst);
        self.supervisor.shutdown().await
    }

    /// Like [`Self::shutdown`], with an explicit timeout
    pub async fn shutdown_within(&self, timeout: Duration) -> bool {
        self.accepting.store(false, Ordering::SeqCst);
        self.supervisor.drain(timeout).await
    }
}

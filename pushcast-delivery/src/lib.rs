//! Broadcast dispatch and delivery-outcome reconciliation
//!
//! This crate provides:
//! - Recipient resolution from the contact registry
//! - Bounded-concurrency fan-out to a push provider with transient retry
//! - Registry repair for permanently invalid targets
//! - Delivery history and aggregate statistics
//! - Synchronous and deferred broadcast pipelines

mod aggregator;
mod dispatcher;
mod error;
mod orchestrator;
pub mod policy;
mod provider;
mod recorder;
mod resolver;
mod sanitizer;
mod supervisor;

pub use aggregator::{StatsAggregator, StoreStatsAggregator};
pub use dispatcher::{DispatchConfig, Dispatcher, PushDispatcher};
pub use error::{BroadcastError, DeliveryError, PermanentError, SystemError, TemporaryError};
pub use orchestrator::{BroadcastOrchestrator, BroadcastReport, Stages};
pub use policy::RetryPolicy;
pub use provider::{LogProvider, ProviderConfig, ProviderError, PushProvider};
pub use recorder::{HistoryRecorder, StoreHistoryRecorder};
pub use resolver::{RecipientResolver, RegistryResolver};
pub use sanitizer::{RegistrySanitizer, StoreRegistrySanitizer};
pub use supervisor::{DeferredConfig, DeferredFailure, DeferredSupervisor};

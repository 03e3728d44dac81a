//! Synchronous broadcast pipeline

use std::sync::Arc;

use chrono::Utc;
use pushcast_common::{
    BroadcastMessage, DispatchOutcome, MessageContent, MessageId, MessageStats,
    tracing::{self, error, info},
};
use pushcast_store::{StoreError, Stores};

use crate::{
    aggregator::{StatsAggregator, StoreStatsAggregator},
    dispatcher::{DispatchConfig, Dispatcher, PushDispatcher},
    error::BroadcastError,
    provider::PushProvider,
    recorder::{HistoryRecorder, StoreHistoryRecorder},
    resolver::{RecipientResolver, RegistryResolver},
    sanitizer::{RegistrySanitizer, StoreRegistrySanitizer},
};

/// The collaborators of a broadcast, one per pipeline stage.
///
/// Every handle is reference counted and lives as long as the longest
/// holder, so a clone can be moved into work that outlives the request
/// that started it.
#[derive(Debug, Clone)]
pub struct Stages {
    pub resolver: Arc<dyn RecipientResolver>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub sanitizer: Arc<dyn RegistrySanitizer>,
    pub recorder: Arc<dyn HistoryRecorder>,
    pub aggregator: Arc<dyn StatsAggregator>,
}

impl Stages {
    /// Store-backed stages sending through `provider`
    #[must_use]
    pub fn from_stores(
        stores: &Stores,
        provider: Arc<dyn PushProvider>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            resolver: Arc::new(RegistryResolver::new(Arc::clone(&stores.contacts))),
            dispatcher: Arc::new(PushDispatcher::new(provider, config)),
            sanitizer: Arc::new(StoreRegistrySanitizer::new(Arc::clone(&stores.contacts))),
            recorder: Arc::new(StoreHistoryRecorder::new(Arc::clone(&stores.history))),
            aggregator: Arc::new(StoreStatsAggregator::new(Arc::clone(&stores.stats))),
        }
    }
}

/// What happened during one run of the pipeline.
///
/// Bookkeeping stages that failed are `None`/`false`; their errors have
/// already been logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub message_id: MessageId,
    pub targets: usize,
    pub removed_targets: Option<u64>,
    pub history_recorded: bool,
    pub stats: Option<MessageStats>,
}

impl BroadcastReport {
    /// Returns `true` if every bookkeeping stage succeeded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.removed_targets.is_some() && self.history_recorded && self.stats.is_some()
    }
}

/// Runs broadcasts stage by stage.
#[derive(Debug, Clone)]
pub struct BroadcastOrchestrator {
    stages: Stages,
}

fn log_bookkeeping_failure(message_id: MessageId, stage: &'static str, error: &StoreError) {
    error!(
        %message_id,
        stage,
        error = %error,
        "Bookkeeping failed after dispatch; the message was still sent"
    );
}

impl BroadcastOrchestrator {
    #[must_use]
    pub const fn new(stages: Stages) -> Self {
        Self { stages }
    }

    #[must_use]
    pub const fn stages(&self) -> &Stages {
        &self.stages
    }

    /// Broadcast to every recipient of `domain` and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, or if recipients cannot
    /// be resolved or the dispatch cannot run. Failures after the dispatch
    /// are logged and the message ID is still returned.
    pub async fn broadcast(
        &self,
        domain: &str,
        content: MessageContent,
    ) -> Result<MessageId, BroadcastError> {
        let message = BroadcastMessage::new(domain, content)?;
        self.run(&message).await.map(|report| report.message_id)
    }

    /// Run every stage for an already created message.
    ///
    /// # Errors
    ///
    /// Returns an error if recipients cannot be resolved or the dispatch
    /// cannot run.
    #[tracing::instrument(level = "debug", skip_all, fields(message_id = %message.id(), domain = message.domain()))]
    pub async fn run(&self, message: &BroadcastMessage) -> Result<BroadcastReport, BroadcastError> {
        let message_id = message.id();

        let targets = self.stages.resolver.resolve(message.domain()).await?;

        // Materialized once; every later stage reads the same outcomes
        let outcomes: Vec<DispatchOutcome> = self
            .stages
            .dispatcher
            .dispatch(message.content(), &targets)
            .await?;

        let removed_targets = match self.stages.sanitizer.sanitize(&outcomes).await {
            Ok(removed) => Some(removed),
            Err(e) => {
                log_bookkeeping_failure(message_id, "sanitize", &e);
                None
            }
        };

        let history_recorded = match self
            .stages
            .recorder
            .record(message_id, &outcomes, Utc::now())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log_bookkeeping_failure(message_id, "record", &e);
                false
            }
        };

        let stats = match self
            .stages
            .aggregator
            .aggregate(message_id, message.domain(), &outcomes)
            .await
        {
            Ok(stats) => Some(stats),
            Err(e) => {
                log_bookkeeping_failure(message_id, "aggregate", &e);
                None
            }
        };

        info!(
            %message_id,
            targets = targets.len(),
            delivered = outcomes.iter().filter(|o| o.is_success).count(),
            elapsed_ms = (Utc::now() - message.created_at()).num_milliseconds(),
            "Broadcast finished"
        );

        Ok(BroadcastReport {
            message_id,
            targets: targets.len(),
            removed_targets,
            history_recorded,
            stats,
        })
    }

    /// Stats of a finished broadcast, `None` if there are none (yet).
    ///
    /// # Errors
    ///
    /// Returns an error if the stats store cannot be read.
    pub async fn message_stats(
        &self,
        domain: &str,
        message_id: MessageId,
    ) -> Result<Option<MessageStats>, StoreError> {
        self.stages.aggregator.lookup(domain, message_id).await
    }
}

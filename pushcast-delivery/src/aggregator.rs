use std::sync::Arc;

use async_trait::async_trait;
use pushcast_common::{DispatchOutcome, MessageId, MessageStats};
use pushcast_store::{StatsStore, StoreError};

/// Computes and serves the aggregate counts of a broadcast.
#[async_trait]
pub trait StatsAggregator: Send + Sync + std::fmt::Debug {
    /// Count `outcomes`, persist the result and return it.
    async fn aggregate(
        &self,
        message_id: MessageId,
        domain: &str,
        outcomes: &[DispatchOutcome],
    ) -> Result<MessageStats, StoreError>;

    /// Stats of a finished broadcast to `domain`.
    ///
    /// `None` when the broadcast is unknown, still running, or belongs to
    /// another domain. There is no pending state.
    async fn lookup(
        &self,
        domain: &str,
        message_id: MessageId,
    ) -> Result<Option<MessageStats>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct StoreStatsAggregator {
    stats: Arc<dyn StatsStore>,
}

impl StoreStatsAggregator {
    #[must_use]
    pub fn new(stats: Arc<dyn StatsStore>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl StatsAggregator for StoreStatsAggregator {
    async fn aggregate(
        &self,
        message_id: MessageId,
        domain: &str,
        outcomes: &[DispatchOutcome],
    ) -> Result<MessageStats, StoreError> {
        let stats = MessageStats::from_outcomes(message_id, domain, outcomes);
        self.stats.upsert(stats.clone()).await?;

        tracing::info!(
            %message_id,
            domain,
            sent = stats.sent,
            delivered = stats.delivered,
            not_delivered = stats.not_delivered,
            "Broadcast statistics stored"
        );
        Ok(stats)
    }

    async fn lookup(
        &self,
        domain: &str,
        message_id: MessageId,
    ) -> Result<Option<MessageStats>, StoreError> {
        Ok(self
            .stats
            .get(message_id)
            .await?
            .filter(|stats| stats.domain == domain))
    }
}

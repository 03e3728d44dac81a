use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pushcast_common::{DispatchOutcome, HistoryEvent, MessageId};
use pushcast_store::{HistoryStore, StoreError};

/// Writes the per-target delivery history of a broadcast.
#[async_trait]
pub trait HistoryRecorder: Send + Sync + std::fmt::Debug {
    /// Append one event per outcome, all stamped with `timestamp`.
    ///
    /// Sends cannot be recalled, so a failure here is reported but nothing
    /// is rolled back.
    async fn record(
        &self,
        message_id: MessageId,
        outcomes: &[DispatchOutcome],
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct StoreHistoryRecorder {
    history: Arc<dyn HistoryStore>,
}

impl StoreHistoryRecorder {
    #[must_use]
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl HistoryRecorder for StoreHistoryRecorder {
    async fn record(
        &self,
        message_id: MessageId,
        outcomes: &[DispatchOutcome],
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let events: Vec<_> = outcomes
            .iter()
            .map(|outcome| HistoryEvent::from_outcome(message_id, outcome, timestamp))
            .collect();
        let count = events.len();

        self.history.append_many(events).await?;

        tracing::debug!(%message_id, events = count, "Recorded delivery history");
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::{message::MessageId, outcome::DispatchOutcome};

/// Aggregate delivery counts for one broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    pub message_id: MessageId,
    pub domain: String,
    pub sent: u64,
    pub delivered: u64,
    pub not_delivered: u64,
}

impl MessageStats {
    /// Count a complete outcome set.
    ///
    /// `sent` is the number of outcomes and `delivered + not_delivered == sent`.
    #[must_use]
    pub fn from_outcomes(message_id: MessageId, domain: &str, outcomes: &[DispatchOutcome]) -> Self {
        let sent = outcomes.len() as u64;
        let delivered = outcomes.iter().filter(|o| o.is_success).count() as u64;

        Self {
            message_id,
            domain: domain.to_string(),
            sent,
            delivered,
            not_delivered: sent - delivered,
        }
    }
}

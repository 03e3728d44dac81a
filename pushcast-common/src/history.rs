use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{contact::DeviceToken, message::MessageId, outcome::DispatchOutcome};

/// Durable record of one send attempt within a broadcast.
///
/// History is append-only: events are never updated or removed, and a
/// replayed broadcast may leave more than one event for the same token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub message_id: MessageId,
    pub device_token: DeviceToken,
    pub sent_success: bool,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub details: Option<String>,
}

impl HistoryEvent {
    #[must_use]
    pub fn from_outcome(
        message_id: MessageId,
        outcome: &DispatchOutcome,
        event_date: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id,
            device_token: outcome.device_token.clone(),
            sent_success: outcome.is_success,
            event_date,
            details: outcome.error_detail.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_failed_outcome_keeps_detail() {
        let id = MessageId::generate();
        let at = Utc::now();
        let outcome = DispatchOutcome::invalid_target(DeviceToken::from("b"), "unregistered");

        let event = HistoryEvent::from_outcome(id, &outcome, at);

        assert_eq!(event.message_id, id);
        assert_eq!(event.device_token.as_str(), "b");
        assert!(!event.sent_success);
        assert_eq!(event.event_date, at);
        assert_eq!(event.details.as_deref(), Some("unregistered"));
    }
}

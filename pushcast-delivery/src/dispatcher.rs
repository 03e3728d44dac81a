//! Fan-out of one message to many device tokens

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use pushcast_common::{
    DeviceToken, DispatchOutcome, MessageContent, outbound,
    tracing::{debug, info, warn},
};
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::{
    error::{DeliveryError, SystemError, TemporaryError},
    policy::RetryPolicy,
    provider::PushProvider,
};

const fn default_max_concurrent_sends() -> usize {
    16
}

const fn default_send_timeout() -> u64 {
    10
}

/// Tuning of the send worker pool
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of sends in flight at once
    ///
    /// Default: 16
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,

    /// How long a single send may take before it counts as a transient failure
    ///
    /// Default: 10 seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: default_max_concurrent_sends(),
            send_timeout_secs: default_send_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Sends a message to a set of targets.
#[async_trait]
pub trait Dispatcher: Send + Sync + std::fmt::Debug {
    /// Returns exactly one outcome per entry of `targets`, duplicates
    /// included, in no particular order.
    ///
    /// # Errors
    ///
    /// Fails only when no send can be attempted at all. A failure on a
    /// single target is reported in its outcome instead.
    async fn dispatch(
        &self,
        content: &MessageContent,
        targets: &[DeviceToken],
    ) -> Result<Vec<DispatchOutcome>, DeliveryError>;
}

/// Dispatcher backed by a [`PushProvider`] and a bounded pool of send tasks.
#[derive(Debug, Clone)]
pub struct PushDispatcher {
    provider: Arc<dyn PushProvider>,
    config: DispatchConfig,
}

impl PushDispatcher {
    #[must_use]
    pub fn new(provider: Arc<dyn PushProvider>, config: DispatchConfig) -> Self {
        Self { provider, config }
    }
}

/// Everything a send task needs, shared between all tasks of one fan-out
#[derive(Debug)]
struct SendContext {
    provider: Arc<dyn PushProvider>,
    content: MessageContent,
    retry: RetryPolicy,
    timeout: Duration,
}

/// Send to one target, retrying temporary failures per the retry policy
async fn send_with_retry(context: Arc<SendContext>, target: DeviceToken) -> DispatchOutcome {
    let mut attempts = 0;

    loop {
        attempts += 1;

        let result = match tokio::time::timeout(
            context.timeout,
            context.provider.send(&context.content, &target),
        )
        .await
        {
            Ok(result) => result.map_err(DeliveryError::from),
            Err(_) => Err(TemporaryError::Timeout(format!(
                "No response within {:?}",
                context.timeout
            ))
            .into()),
        };

        match result {
            Ok(()) => {
                outbound!(device_token = %target, attempts, "Push accepted");
                return DispatchOutcome::delivered(target);
            }
            Err(DeliveryError::Permanent(e)) => {
                debug!(device_token = %target, error = %e, "Target is permanently invalid");
                return DispatchOutcome::invalid_target(target, e.to_string());
            }
            Err(e) if e.is_temporary() && context.retry.should_retry(attempts) => {
                let delay = context.retry.retry_delay(attempts);
                debug!(
                    device_token = %target,
                    attempt = attempts,
                    remaining = context.retry.remaining_attempts(attempts),
                    ?delay,
                    error = %e,
                    "Transient send failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(device_token = %target, attempts, error = %e, "Send failed");
                return DispatchOutcome::failed(target, e.to_string());
            }
        }
    }
}

fn spawn_send(
    join_set: &mut JoinSet<(usize, DispatchOutcome)>,
    context: &Arc<SendContext>,
    index: usize,
    target: DeviceToken,
) {
    let context = Arc::clone(context);
    join_set.spawn(async move { (index, send_with_retry(context, target).await) });
}

#[async_trait]
impl Dispatcher for PushDispatcher {
    async fn dispatch(
        &self,
        content: &MessageContent,
        targets: &[DeviceToken],
    ) -> Result<Vec<DispatchOutcome>, DeliveryError> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        self.provider
            .ready()
            .await
            .map_err(|e| SystemError::ProviderUnavailable(e.to_string()))?;

        let context = Arc::new(SendContext {
            provider: Arc::clone(&self.provider),
            content: content.clone(),
            retry: self.config.retry,
            timeout: Duration::from_secs(self.config.send_timeout_secs),
        });
        let max_concurrent = self.config.max_concurrent_sends.max(1);

        info!(
            targets = targets.len(),
            max_concurrent, "Dispatching to targets with parallel workers"
        );

        // Slots are indexed by position so duplicate tokens each get an outcome
        let mut outcomes: Vec<Option<DispatchOutcome>> = vec![None; targets.len()];
        let mut join_set = JoinSet::new();
        let mut pending = targets.iter().cloned().enumerate();

        // Spawn initial batch of tasks (up to max_concurrent)
        for (index, target) in pending.by_ref().take(max_concurrent) {
            spawn_send(&mut join_set, &context, index, target);
        }

        // As tasks complete, spawn new ones for remaining targets
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!(error = %e, "Send task ended without reporting an outcome"),
            }

            if let Some((index, target)) = pending.next() {
                spawn_send(&mut join_set, &context, index, target);
            }
        }

        Ok(outcomes
            .into_iter()
            .zip(targets)
            .map(|(outcome, target)| {
                outcome.unwrap_or_else(|| {
                    DispatchOutcome::failed(target.clone(), "Send task ended without reporting")
                })
            })
            .collect())
    }
}

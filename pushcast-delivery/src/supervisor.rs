//! Detached broadcasts
//!
//! A deferred broadcast hands its message ID back before any work starts.
//! The pipeline then runs on its own task, holding its own handle to the
//! long-lived [`BroadcastOrchestrator`], so it is unaffected by the caller
//! going away. Failures have nobody to return to: they are logged and
//! published on a broadcast channel instead.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use pushcast_common::{
    BroadcastMessage, MessageContent, MessageId, internal,
    tracing::{debug, error},
};
use serde::Deserialize;
use tokio::{
    runtime::Handle,
    sync::{Notify, Semaphore, broadcast},
};

use crate::{error::BroadcastError, orchestrator::BroadcastOrchestrator};

const fn default_max_in_flight() -> usize {
    8
}

const fn default_shutdown_timeout() -> u64 {
    30
}

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// Limits for deferred broadcasts
#[derive(Debug, Clone, Deserialize)]
pub struct DeferredConfig {
    /// How many deferred broadcasts may run at the same time
    ///
    /// Further requests are still accepted and wait for a free slot.
    ///
    /// Default: 8
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// How long shutdown waits for running broadcasts to finish
    ///
    /// Default: 30 seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

/// A deferred broadcast that could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredFailure {
    pub message_id: MessageId,
    pub domain: String,
    pub error: String,
}

/// Counts a deferred broadcast as running until dropped, even if the task panics
struct InFlight {
    count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl InFlight {
    fn enter(count: &Arc<AtomicUsize>, idle: &Arc<Notify>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self {
            count: Arc::clone(count),
            idle: Arc::clone(idle),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

fn report_failure(failures: &broadcast::Sender<DeferredFailure>, failure: DeferredFailure) {
    error!(
        message_id = %failure.message_id,
        domain = %failure.domain,
        error = %failure.error,
        "Deferred broadcast failed"
    );

    // Having no subscribers is fine, the log entry above is the record
    let _ = failures.send(failure);
}

/// Runs broadcasts in the background on behalf of callers that do not wait.
#[derive(Debug)]
pub struct DeferredSupervisor {
    orchestrator: Arc<BroadcastOrchestrator>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    failures: broadcast::Sender<DeferredFailure>,
    config: DeferredConfig,
}

impl DeferredSupervisor {
    /// Background tasks are spawned on `runtime`, independent of whichever
    /// task calls [`Self::broadcast_deferred`].
    #[must_use]
    pub fn new(
        orchestrator: Arc<BroadcastOrchestrator>,
        config: DeferredConfig,
        runtime: Handle,
    ) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        Self {
            orchestrator,
            runtime,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            failures,
            config,
        }
    }

    /// Accept a broadcast and return its ID without waiting for it.
    ///
    /// Until the background run has finished, the stats of the returned ID
    /// are not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid. Nothing is scheduled then.
    pub fn broadcast_deferred(
        &self,
        domain: &str,
        content: MessageContent,
    ) -> Result<MessageId, BroadcastError> {
        let message = BroadcastMessage::new(domain, content)?;
        let message_id = message.id();
        let domain = message.domain().to_string();

        let guard = InFlight::enter(&self.in_flight, &self.idle);
        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let failures = self.failures.clone();
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            let _guard = guard;
            // The semaphore is never closed, so this only fails if it is dropped
            let _permit = permits.acquire_owned().await.ok();

            debug!(%message_id, "Starting deferred broadcast");

            // Run on a separate task so a panic is observed here rather than lost
            let pipeline =
                runtime.spawn(async move { orchestrator.run(&message).await.map(|_| ()) });
            let failure = match pipeline.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(format!("Broadcast task failed: {e}")),
            };

            if let Some(error) = failure {
                report_failure(
                    &failures,
                    DeferredFailure {
                        message_id,
                        domain,
                        error,
                    },
                );
            }
        });

        debug!(%message_id, "Deferred broadcast scheduled");
        Ok(message_id)
    }

    /// Receive every future deferred broadcast failure.
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<DeferredFailure> {
        self.failures.subscribe()
    }

    /// Number of deferred broadcasts accepted but not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait for running broadcasts to finish, up to `timeout`.
    ///
    /// Returns `true` if nothing is running any more.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let drained = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok();

        if drained {
            internal!("All deferred broadcasts completed");
        } else {
            error!(
                remaining = self.in_flight(),
                "Shutdown timeout exceeded with deferred broadcasts still running"
            );
        }

        drained
    }

    /// [`Self::drain`] with the configured shutdown timeout.
    pub async fn shutdown(&self) -> bool {
        internal!(
            level = INFO,
            in_flight = self.in_flight(),
            "Waiting for deferred broadcasts"
        );
        self.drain(Duration::from_secs(self.config.shutdown_timeout_secs))
            .await
    }
}

//! Shared fixtures for the pipeline integration tests

#![allow(dead_code, clippy::unwrap_used)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use pushcast_common::{Contact, DeviceToken, MessageContent};
use pushcast_delivery::{
    BroadcastOrchestrator, DispatchConfig, ProviderError, PushProvider, RetryPolicy, Stages,
};
use pushcast_store::{ContactStore, Stores, TestContactStore, TestHistoryStore, TestStatsStore};
use tokio::sync::Notify;

/// How the scripted provider answers for one token
#[derive(Debug, Clone)]
pub enum Script {
    Deliver,
    Invalid,
    /// The provider refuses the payload itself
    Rejected,
    /// Fail with a 503 this many times, then deliver
    Flaky(usize),
    /// Always fail with a 503
    Down,
    /// Deliver after a delay
    Slow(Duration),
}

/// Push provider answering per token from a script. Unscripted tokens are delivered.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, String)>>,
    unavailable: AtomicBool,
    held: AtomicBool,
    released: Notify,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, token: &str, script: Script) -> &Self {
        self.scripts.lock().unwrap().insert(token.to_string(), script);
        self
    }

    /// Hold every send until [`Self::release`] is called
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }

    async fn wait_for_gate(&self) {
        loop {
            let released = self.released.notified();
            if !self.held.load(Ordering::SeqCst) {
                return;
            }
            released.await;
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of send attempts made for `token`
    pub fn calls_for(&self, token: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == token)
            .count()
    }

    /// Titles of every message sent, one per attempt
    pub fn titles(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, title)| title.clone())
            .collect()
    }
}

#[async_trait]
impl PushProvider for ScriptedProvider {
    async fn send(
        &self,
        content: &MessageContent,
        target: &DeviceToken,
    ) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((target.to_string(), content.title.clone()));

        self.wait_for_gate().await;

        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get(target.as_str()).cloned() {
                Some(Script::Flaky(0)) | None => Script::Deliver,
                Some(Script::Flaky(n)) => {
                    scripts.insert(target.to_string(), Script::Flaky(n - 1));
                    Script::Down
                }
                Some(script) => script,
            }
        };

        match script {
            Script::Deliver | Script::Flaky(_) => Ok(()),
            Script::Invalid => Err(ProviderError::Unregistered(target.to_string())),
            Script::Rejected => Err(ProviderError::PayloadRejected(
                "payload exceeds 4096 bytes".to_string(),
            )),
            Script::Down => Err(ProviderError::Status {
                code: 503,
                message: "Service Unavailable".to_string(),
            }),
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    async fn ready(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Unavailable("credentials revoked".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A pipeline wired to test stores and a scripted provider
pub struct Harness {
    pub contacts: TestContactStore,
    pub history: TestHistoryStore,
    pub stats: TestStatsStore,
    pub provider: Arc<ScriptedProvider>,
    pub orchestrator: Arc<BroadcastOrchestrator>,
}

pub fn fast_dispatch() -> DispatchConfig {
    DispatchConfig {
        max_concurrent_sends: 4,
        send_timeout_secs: 5,
        retry: RetryPolicy {
            max_attempts: 3,
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 10,
            retry_jitter_factor: 0.0,
        },
    }
}

impl Harness {
    pub fn new() -> Self {
        let contacts = TestContactStore::new();
        let history = TestHistoryStore::new();
        let stats = TestStatsStore::new();
        let provider = Arc::new(ScriptedProvider::new());

        let stores = Stores {
            contacts: Arc::new(contacts.clone()),
            history: Arc::new(history.clone()),
            stats: Arc::new(stats.clone()),
        };
        let stages = Stages::from_stores(&stores, provider.clone(), fast_dispatch());

        Self {
            contacts,
            history,
            stats,
            provider,
            orchestrator: Arc::new(BroadcastOrchestrator::new(stages)),
        }
    }

    pub async fn register(&self, domain: &str, tokens: &[&str]) {
        for token in tokens {
            self.contacts
                .upsert(Contact::new(*token, domain))
                .await
                .unwrap();
        }
    }

    pub async fn tokens(&self, domain: &str) -> Vec<String> {
        self.contacts
            .device_tokens_by_domain(domain)
            .await
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

pub fn message() -> MessageContent {
    MessageContent::new("Sale", "Everything must go").with_link("https://example.com/sale")
}

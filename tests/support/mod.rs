#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use pushcast::PushContactApi;
use pushcast_common::{DeviceToken, MessageContent};
use pushcast_delivery::{DeferredConfig, DispatchConfig, ProviderError, PushProvider, RetryPolicy};
use pushcast_store::StoreConfig;
use tokio::runtime::Handle;

/// Rejects every token starting with `stale-` as unregistered
#[derive(Debug, Default)]
pub struct StaleTokenProvider;

#[async_trait]
impl PushProvider for StaleTokenProvider {
    async fn send(
        &self,
        _content: &MessageContent,
        target: &DeviceToken,
    ) -> Result<(), ProviderError> {
        if target.as_str().starts_with("stale-") {
            Err(ProviderError::Unregistered(target.to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn api() -> PushContactApi {
    let stores = StoreConfig::default().build();

    PushContactApi::new(
        &stores,
        Arc::new(StaleTokenProvider),
        DispatchConfig {
            max_concurrent_sends: 4,
            send_timeout_secs: 5,
            retry: RetryPolicy::never(),
        },
        DeferredConfig {
            max_in_flight: 2,
            shutdown_timeout_secs: 5,
        },
        Handle::current(),
    )
}

pub const WAIT: Duration = Duration::from_secs(5);

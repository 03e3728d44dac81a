use std::{
    future::Future,
    path::Path,
    sync::{Arc, LazyLock},
};

use pushcast_common::{Signal, internal, logging};
use pushcast_control::{ControlServer, DEFAULT_CONTROL_SOCKET};
use pushcast_delivery::{DeferredConfig, DispatchConfig, ProviderConfig};
use pushcast_store::StoreConfig;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::{api::PushContactApi, control_handler::PushcastControlHandler};

fn default_control_socket() -> String {
    DEFAULT_CONTROL_SOCKET.to_string()
}

/// Top-level service configuration
///
/// # Examples
///
/// ```ron
/// Pushcast (
///     control_socket: "/run/pushcast.sock",
///     store: Memory(capacity: Some(100000)),
///     delivery: (
///         max_concurrent_sends: 32,
///         send_timeout_secs: 10,
///         retry: (
///             max_attempts: 3,
///             base_retry_delay_ms: 200,
///             max_retry_delay_ms: 5000,
///             retry_jitter_factor: 0.1,
///         ),
///     ),
///     deferred: (
///         max_in_flight: 8,
///         shutdown_timeout_secs: 30,
///     ),
///     provider: Log,
/// )
/// ```
#[derive(Debug, Deserialize)]
pub struct Pushcast {
    /// Unix socket that `pushcastctl` talks to
    ///
    /// Default: `/tmp/pushcast.sock`
    #[serde(default = "default_control_socket")]
    control_socket: String,
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    delivery: DispatchConfig,
    #[serde(default)]
    deferred: DeferredConfig,
    #[serde(default)]
    provider: ProviderConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

#[tracing::instrument(level = "trace")]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!("Terminate Signal received, shutting down");
        }
    };

    Ok(())
}

impl Pushcast {
    /// Parse a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is not a valid configuration.
    pub fn from_ron(config: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(config)?)
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config from {}: {e}", path.display())
        })?;

        Self::from_ron(&config)
    }

    /// Build the stores and pipeline described by this configuration.
    ///
    /// Deferred broadcasts are spawned onto the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn build(&self) -> PushContactApi {
        let stores = self.store.build();
        let provider = self.provider.build();

        internal!(
            level = DEBUG,
            max_concurrent_sends = self.delivery.max_concurrent_sends,
            max_in_flight = self.deferred.max_in_flight,
            "Building broadcast pipeline"
        );

        PushContactApi::new(
            &stores,
            provider,
            self.delivery.clone(),
            self.deferred.clone(),
            tokio::runtime::Handle::current(),
        )
    }

    /// Run the service until SIGINT or SIGTERM
    ///
    /// # Errors
    ///
    /// This function will return an error if the shutdown signal handlers
    /// cannot be installed, or if the control socket cannot be served.
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();

        self.serve(&SHUTDOWN_BROADCAST, shutdown()).await
    }

    /// Serve control requests until `stop` resolves, then drain
    ///
    /// [`Signal::Shutdown`] is published on `signals` once `stop` resolves.
    /// Broadcasts are refused from then on, while the control socket keeps
    /// answering until deferred broadcasts have drained and
    /// [`Signal::Finalised`] is published.
    ///
    /// # Errors
    ///
    /// Returns an error if `stop` fails, or if the control server cannot
    /// start or stops on its own.
    pub async fn serve<F>(self, signals: &broadcast::Sender<Signal>, stop: F) -> anyhow::Result<()>
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        let api = Arc::new(self.build());
        let server = ControlServer::new(
            self.control_socket.clone(),
            Arc::new(PushcastControlHandler::new(Arc::clone(&api))),
        );
        let receiver = signals.subscribe();
        let mut control = tokio::spawn(async move { server.serve(receiver).await });

        internal!(
            level = INFO,
            control_socket = %self.control_socket,
            "Pushcast running"
        );

        let stopped = tokio::select! {
            served = &mut control => {
                return match served {
                    Ok(Ok(())) => Err(anyhow::anyhow!("Control server stopped unexpectedly")),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(e.into()),
                };
            }
            stopped = stop => stopped,
        };

        internal!(level = INFO, "Shutting down...");
        // The control server holds a receiver, so this only fails if it already exited
        let _ = signals.send(Signal::Shutdown);

        if !api.shutdown().await {
            tracing::warn!("Exiting with deferred broadcasts still running");
        }

        let _ = signals.send(Signal::Finalised);
        control.await??;

        stopped
    }
}

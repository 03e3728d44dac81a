//! Control server implementation

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use pushcast_common::Signal;
use tokio::{
    net::{UnixListener, UnixStream},
    sync::broadcast,
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    ControlError, Request, Response, Result,
    protocol::{read_frame, write_frame},
};

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Processes control requests on behalf of the server
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a request and return a response
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be processed. The error is sent
    /// back to the client as an error response.
    async fn handle_request(&self, request: Request) -> Result<Response>;
}

/// Serves control requests on a Unix domain socket
pub struct ControlServer {
    socket_path: String,
    handler: Arc<dyn CommandHandler>,
}

impl ControlServer {
    #[must_use]
    pub fn new(socket_path: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            socket_path: socket_path.into(),
            handler,
        }
    }

    /// Serve requests until [`Signal::Finalised`] is received
    ///
    /// [`Signal::Shutdown`] does not stop the server: requests are still
    /// answered while deferred work drains, so callers can keep asking
    /// for the stats of broadcasts that are finishing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another running instance owns the socket
    /// - The socket cannot be bound
    pub async fn serve(&self, mut signals: broadcast::Receiver<Signal>) -> Result<()> {
        let socket_path = Path::new(&self.socket_path);
        if socket_path.exists() {
            if UnixStream::connect(socket_path).await.is_ok() {
                return Err(ControlError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrInUse,
                    format!(
                        "Socket already in use by running instance: {}",
                        self.socket_path
                    ),
                )));
            }
            info!("Removing stale socket file: {}", self.socket_path);
            tokio::fs::remove_file(socket_path).await?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        #[cfg(unix)]
        {
            let mut perms = tokio::fs::metadata(&self.socket_path).await?.permissions();
            perms.set_mode(0o600);
            tokio::fs::set_permissions(&self.socket_path, perms).await?;
        }
        info!("Control server listening on: {}", self.socket_path);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let handler = Arc::clone(&self.handler);
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, handler).await {
                                    error!("Error handling control connection: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            error!("Error accepting control connection: {e}");
                        }
                    }
                }
                sig = signals.recv() => {
                    match sig {
                        Ok(Signal::Shutdown) => {
                            info!("Control server still answering while shutdown completes");
                        }
                        Ok(Signal::Finalised) => {
                            info!("Control server shutting down");
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Control server missed signals");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            error!("Control server signal channel closed");
                            break;
                        }
                    }
                }
            }
        }

        if socket_path.exists() {
            debug!("Removing socket file: {}", self.socket_path);
            let _ = tokio::fs::remove_file(socket_path).await;
        }

        Ok(())
    }

    async fn handle_connection(
        mut stream: UnixStream,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<()> {
        let request: Request = tokio::time::timeout(CONNECTION_TIMEOUT, read_frame(&mut stream))
            .await
            .map_err(|_| ControlError::Timeout)??;

        trace!("Received request: {request:?}");

        let response = if request.version == crate::PROTOCOL_VERSION {
            match handler.handle_request(request).await {
                Ok(response) => response,
                Err(ControlError::ServerError(message)) => {
                    warn!("Request refused: {message}");
                    Response::error(message)
                }
                Err(e) => {
                    warn!("Error handling request: {e}");
                    Response::error(e.to_string())
                }
            }
        } else {
            Response::error(
                ControlError::IncompatibleVersion {
                    server: crate::PROTOCOL_VERSION,
                    client: request.version,
                }
                .to_string(),
            )
        };

        trace!("Sending response: {response:?}");

        tokio::time::timeout(CONNECTION_TIMEOUT, write_frame(&mut stream, &response))
            .await
            .map_err(|_| ControlError::Timeout)??;

        Ok(())
    }
}

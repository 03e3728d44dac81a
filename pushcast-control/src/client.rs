//! Client for connecting to the control socket

use std::time::Duration;

use tokio::net::UnixStream;
use tracing::debug;

use crate::{
    ControlError, PROTOCOL_VERSION, Request, Response, ResponsePayload, Result,
    protocol::{read_frame, write_frame},
};

/// Sends one request per connection to a pushcast control server
#[derive(Debug, Clone)]
pub struct ControlClient {
    socket_path: String,
    timeout: Duration,
}

impl ControlClient {
    #[must_use]
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the request timeout
    ///
    /// A synchronous broadcast answers only once every target was tried, so
    /// large domains need more than the default 10 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request and receive its response
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection fails
    /// - Protocol error occurs
    /// - Request times out
    /// - Server returns an error
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| ControlError::Timeout)?
    }

    async fn exchange(&self, request: Request) -> Result<Response> {
        debug!("Connecting to control socket: {}", self.socket_path);
        let mut stream = UnixStream::connect(&self.socket_path).await?;

        write_frame(&mut stream, &request).await?;
        let response: Response = read_frame(&mut stream).await?;

        if !response.is_version_compatible() {
            return Err(ControlError::IncompatibleVersion {
                server: response.version,
                client: PROTOCOL_VERSION,
            });
        }

        if let ResponsePayload::Error(ref err) = response.payload {
            return Err(ControlError::ServerError(err.clone()));
        }

        Ok(response)
    }
}

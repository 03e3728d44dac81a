use thiserror::Error;

/// Errors that can occur during control operations
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    ProtocolDeserialization(#[from] bincode::error::DecodeError),

    #[error("Protocol error: {0}")]
    ProtocolSerialization(#[from] bincode::error::EncodeError),

    /// A frame exceeded the size limit
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(u32),

    #[error("Incompatible protocol version: server={server}, client={client}")]
    IncompatibleVersion { server: u32, client: u32 },

    /// The server handled the request and reported a failure
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, ControlError>;

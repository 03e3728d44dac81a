//! Control protocol types and framing

use pushcast_common::{
    Contact, ContactFilter, DeviceToken, MessageContent, MessageId, MessageStats,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ControlError, MAX_FRAME_SIZE, Result};

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Request sent to the control server (versioned wrapper)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub version: u32,
    pub command: RequestCommand,
}

impl Request {
    #[must_use]
    pub const fn new(command: RequestCommand) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            command,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestCommand {
    Contact(ContactCommand),
    Broadcast(BroadcastCommand),
    System(SystemCommand),
}

/// Contact registry commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ContactCommand {
    /// Register a contact, replacing any registration of the same token
    Add(Contact),
    /// List the contacts matching a filter
    List(ContactFilter),
    UpdateEmail {
        device_token: DeviceToken,
        email: String,
    },
    /// Remove every listed token
    BulkDelete(Vec<DeviceToken>),
}

/// Broadcast commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BroadcastCommand {
    /// Broadcast and wait for the outcome
    Send {
        domain: String,
        message: MessageContent,
    },
    /// Broadcast in the background
    Defer {
        domain: String,
        message: MessageContent,
    },
    /// Delivery statistics of a finished broadcast
    Stats {
        domain: String,
        message_id: MessageId,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SystemCommand {
    Ping,
}

/// Response from the control server (versioned wrapper)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub version: u32,
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponsePayload {
    Ok,
    Data(Box<ResponseData>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseData {
    /// Whether the added contact was new
    ContactAdded(bool),
    Contacts(Vec<Contact>),
    /// Number of contacts removed
    Deleted(u64),
    /// Identity of an accepted broadcast
    MessageId(MessageId),
    /// `None` if the broadcast is unknown or not finished
    Stats(Option<MessageStats>),
    Message(String),
}

impl Response {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Ok,
        }
    }

    #[must_use]
    pub fn data(data: ResponseData) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Data(Box::new(data)),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload: ResponsePayload::Error(message.into()),
        }
    }

    #[must_use]
    pub const fn is_version_compatible(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }

    /// The data carried by this response, if any
    #[must_use]
    pub fn into_data(self) -> Option<ResponseData> {
        match self.payload {
            ResponsePayload::Data(data) => Some(*data),
            ResponsePayload::Ok | ResponsePayload::Error(_) => None,
        }
    }
}

/// Write `value` as one length-prefixed frame
pub(crate) async fn write_frame<W, T>(stream: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::legacy())?;
    let len = u32::try_from(bytes.len())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;

    Ok(())
}

/// Read one length-prefixed frame
pub(crate) async fn read_frame<R, T>(stream: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ControlError::ConnectionClosed
        } else {
            ControlError::Io(e)
        }
    })?;

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(ControlError::FrameTooLarge(len));
    }

    let mut bytes = vec![0u8; len as usize];
    stream.read_exact(&mut bytes).await?;

    let (value, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::legacy())?;
    Ok(value)
}

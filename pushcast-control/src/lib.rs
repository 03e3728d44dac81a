//! Control protocol for a running pushcast instance
//!
//! Requests and responses travel over a Unix domain socket, one request per
//! connection, each framed with a big-endian `u32` length and encoded with
//! bincode.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use error::{ControlError, Result};
pub use protocol::{
    BroadcastCommand, ContactCommand, PROTOCOL_VERSION, Request, RequestCommand, Response,
    ResponseData, ResponsePayload, SystemCommand,
};
pub use server::{CommandHandler, ControlServer};

/// Default path for the control socket
pub const DEFAULT_CONTROL_SOCKET: &str = "/tmp/pushcast.sock";

/// Largest frame either side accepts
pub(crate) const MAX_FRAME_SIZE: u32 = 10_000_000;

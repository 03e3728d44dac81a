//! Push notification broadcaster
//!
//! Wires the contact registry, the broadcast pipeline and the deferred
//! supervisor together behind [`PushContactApi`], and runs them as a
//! service through [`Pushcast`], answering requests on its control socket.

mod api;
mod control_handler;
pub mod controller;

pub use api::{ApiError, PushContactApi};
pub use control_handler::PushcastControlHandler;
pub use controller::{Pushcast, SHUTDOWN_BROADCAST};
pub use pushcast_common::{
    Contact, ContactFilter, DeviceToken, MessageContent, MessageId, MessageStats,
};

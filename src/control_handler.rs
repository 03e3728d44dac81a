//! Control requests against the running service
//!
//! Maps every control command onto [`PushContactApi`]. API failures are
//! returned as [`ControlError::ServerError`], which the control server
//! hands back to the client as an error response.

use std::sync::Arc;

use async_trait::async_trait;
use pushcast_common::tracing::debug;
use pushcast_control::{
    BroadcastCommand, CommandHandler, ContactCommand, ControlError, Request, RequestCommand,
    Response, ResponseData, SystemCommand,
};

use crate::api::{ApiError, PushContactApi};

impl From<ApiError> for ControlError {
    fn from(e: ApiError) -> Self {
        Self::ServerError(e.to_string())
    }
}

/// Handler for control commands
pub struct PushcastControlHandler {
    api: Arc<PushContactApi>,
}

impl PushcastControlHandler {
    #[must_use]
    pub const fn new(api: Arc<PushContactApi>) -> Self {
        Self { api }
    }

    async fn handle_contact_command(
        &self,
        command: ContactCommand,
    ) -> pushcast_control::Result<Response> {
        match command {
            ContactCommand::Add(contact) => {
                let created = self.api.add_contact(contact).await?;
                Ok(Response::data(ResponseData::ContactAdded(created)))
            }
            ContactCommand::List(filter) => {
                let contacts = self.api.list_contacts(&filter).await?;
                Ok(Response::data(ResponseData::Contacts(contacts)))
            }
            ContactCommand::UpdateEmail {
                device_token,
                email,
            } => {
                self.api.update_contact_email(&device_token, email).await?;
                Ok(Response::ok())
            }
            ContactCommand::BulkDelete(device_tokens) => {
                let deleted = self.api.bulk_delete_contacts(&device_tokens).await?;
                Ok(Response::data(ResponseData::Deleted(deleted)))
            }
        }
    }

    async fn handle_broadcast_command(
        &self,
        command: BroadcastCommand,
    ) -> pushcast_control::Result<Response> {
        match command {
            BroadcastCommand::Send { domain, message } => {
                let message_id = self.api.broadcast(&domain, message).await?;
                Ok(Response::data(ResponseData::MessageId(message_id)))
            }
            BroadcastCommand::Defer { domain, message } => {
                let message_id = self.api.broadcast_deferred(&domain, message)?;
                Ok(Response::data(ResponseData::MessageId(message_id)))
            }
            BroadcastCommand::Stats { domain, message_id } => {
                let stats = self.api.message_stats(&domain, message_id).await?;
                Ok(Response::data(ResponseData::Stats(stats)))
            }
        }
    }
}

#[async_trait]
impl CommandHandler for PushcastControlHandler {
    async fn handle_request(&self, request: Request) -> pushcast_control::Result<Response> {
        debug!(command = ?request.command, "Control request");

        match request.command {
            RequestCommand::Contact(command) => self.handle_contact_command(command).await,
            RequestCommand::Broadcast(command) => self.handle_broadcast_command(command).await,
            RequestCommand::System(SystemCommand::Ping) => {
                Ok(Response::data(ResponseData::Message("pong".to_string())))
            }
        }
    }
}

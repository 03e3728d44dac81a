//! Request/response cycle between the control client and server
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::unreachable
)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use pushcast_common::{Contact, ContactFilter, MessageContent, MessageId, Signal};
use pushcast_control::{
    BroadcastCommand, CommandHandler, ContactCommand, ControlClient, ControlError, ControlServer,
    Request, RequestCommand, Response, ResponseData, Result, SystemCommand,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

struct MockHandler {
    message_id: MessageId,
}

#[async_trait]
impl CommandHandler for MockHandler {
    async fn handle_request(&self, request: Request) -> Result<Response> {
        match request.command {
            RequestCommand::System(SystemCommand::Ping) => Ok(Response::ok()),
            RequestCommand::Contact(ContactCommand::List(filter)) => {
                Ok(Response::data(ResponseData::Contacts(vec![
                    Contact::new("A", filter.domain.clone()).with_email("a@example.com"),
                ])))
            }
            RequestCommand::Contact(ContactCommand::Add(contact)) => {
                Ok(Response::data(ResponseData::ContactAdded(
                    !contact.device_token.as_str().is_empty(),
                )))
            }
            RequestCommand::Broadcast(BroadcastCommand::Defer { .. }) => {
                Ok(Response::data(ResponseData::MessageId(self.message_id)))
            }
            RequestCommand::Broadcast(BroadcastCommand::Send { domain, .. }) => Err(
                ControlError::ServerError(format!("No contacts registered for {domain}")),
            ),
            _ => Ok(Response::error("Unsupported")),
        }
    }
}

fn socket_in(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("pushcast.sock")
        .to_str()
        .unwrap()
        .to_string()
}

async fn start_test_server(
    socket_path: &str,
) -> (tokio::task::JoinHandle<Result<()>>, broadcast::Sender<Signal>) {
    let handler = Arc::new(MockHandler {
        message_id: MessageId::generate(),
    });
    let server = ControlServer::new(socket_path, handler);
    let (signals, receiver) = broadcast::channel(4);

    let handle = tokio::spawn(async move { server.serve(receiver).await });

    // Give server time to bind
    tokio::time::sleep(Duration::from_millis(100)).await;

    (handle, signals)
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_ping() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);
    let (_handle, _signals) = start_test_server(&socket_path).await;

    let client = ControlClient::new(&socket_path);
    let response = client
        .send_request(Request::new(RequestCommand::System(SystemCommand::Ping)))
        .await
        .unwrap();

    assert!(response.into_data().is_none());
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_contacts_cross_the_socket() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);
    let (_handle, _signals) = start_test_server(&socket_path).await;

    let client = ControlClient::new(&socket_path);
    let response = client
        .send_request(Request::new(RequestCommand::Contact(ContactCommand::List(
            ContactFilter::for_domain("example.com"),
        ))))
        .await
        .unwrap();

    let Some(ResponseData::Contacts(contacts)) = response.into_data() else {
        panic!("Expected a contact list");
    };
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].device_token.as_str(), "A");
    assert_eq!(contacts[0].domain, "example.com");
    assert_eq!(contacts[0].email.as_deref(), Some("a@example.com"));

    let response = client
        .send_request(Request::new(RequestCommand::Contact(ContactCommand::Add(
            Contact::new("B", "example.com"),
        ))))
        .await
        .unwrap();
    assert_eq!(response.into_data(), Some(ResponseData::ContactAdded(true)));
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_handler_error_reaches_client() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);
    let (_handle, _signals) = start_test_server(&socket_path).await;

    let client = ControlClient::new(&socket_path);
    let result = client
        .send_request(Request::new(RequestCommand::Broadcast(
            BroadcastCommand::Send {
                domain: "empty.example".to_string(),
                message: MessageContent::new("Title", "Body"),
            },
        )))
        .await;

    match result {
        Err(ControlError::ServerError(message)) => {
            assert!(message.contains("No contacts registered for empty.example"));
        }
        other => panic!("Expected a server error, got {other:?}"),
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_incompatible_version_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);
    let (_handle, _signals) = start_test_server(&socket_path).await;

    let mut request = Request::new(RequestCommand::System(SystemCommand::Ping));
    request.version += 1;

    let result = ControlClient::new(&socket_path).send_request(request).await;

    match result {
        Err(ControlError::ServerError(message)) => {
            assert!(message.contains("Incompatible protocol version"));
        }
        other => panic!("Expected a version error, got {other:?}"),
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_server_answers_until_finalised() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);
    let (handle, signals) = start_test_server(&socket_path).await;
    let client = ControlClient::new(&socket_path);

    signals.send(Signal::Shutdown).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = client
        .send_request(Request::new(RequestCommand::Broadcast(
            BroadcastCommand::Defer {
                domain: "example.com".to_string(),
                message: MessageContent::new("Title", "Body"),
            },
        )))
        .await
        .unwrap();
    assert!(matches!(
        response.into_data(),
        Some(ResponseData::MessageId(_))
    ));

    signals.send(Signal::Finalised).unwrap();
    let served = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();

    assert!(served.is_ok());
    assert!(!std::path::Path::new(&socket_path).exists());
    assert!(
        client
            .send_request(Request::new(RequestCommand::System(SystemCommand::Ping)))
            .await
            .is_err()
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_stale_socket_is_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);

    // Left behind by an instance that did not exit cleanly
    drop(std::os::unix::net::UnixListener::bind(&socket_path).unwrap());
    assert!(std::path::Path::new(&socket_path).exists());

    let (_handle, _signals) = start_test_server(&socket_path).await;

    let response = ControlClient::new(&socket_path)
        .send_request(Request::new(RequestCommand::System(SystemCommand::Ping)))
        .await;
    assert!(response.is_ok());
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_running_instance_keeps_its_socket() {
    let temp_dir = TempDir::new().unwrap();
    let socket_path = socket_in(&temp_dir);
    let (_handle, _signals) = start_test_server(&socket_path).await;

    let (_, receiver) = broadcast::channel(1);
    let second = ControlServer::new(
        &socket_path,
        Arc::new(MockHandler {
            message_id: MessageId::generate(),
        }),
    );

    match second.serve(receiver).await {
        Err(ControlError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::AddrInUse),
        other => panic!("Expected the socket to be in use, got {other:?}"),
    }
}

#[tokio::test]
#[cfg_attr(miri, ignore)]
async fn test_missing_server() {
    let temp_dir = TempDir::new().unwrap();
    let client = ControlClient::new(socket_in(&temp_dir));

    let result = client
        .send_request(Request::new(RequestCommand::System(SystemCommand::Ping)))
        .await;

    assert!(matches!(result, Err(ControlError::Io(_))));
}

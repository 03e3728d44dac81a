//! Command-line utility for a running pushcast instance
//!
//! Every command is sent over the control socket; nothing is read from the
//! registry directly.

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pushcast_common::{Contact, ContactFilter, DeviceToken, MessageContent, MessageId};
use pushcast_control::{
    BroadcastCommand, ContactCommand, ControlClient, DEFAULT_CONTROL_SOCKET, Request,
    RequestCommand, ResponseData, SystemCommand,
};

/// Manage a running pushcast instance
#[derive(Parser, Debug)]
#[command(name = "pushcastctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the control socket
    #[arg(short = 'c', long, default_value = DEFAULT_CONTROL_SOCKET)]
    control_socket: String,

    /// Seconds to wait for an answer
    #[arg(short, long, default_value_t = 60)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Contact registry
    Contact {
        #[command(subcommand)]
        action: ContactAction,
    },
    /// Send a notification to every contact of a domain
    Broadcast {
        domain: String,
        title: String,
        body: String,

        /// Link opened when the notification is clicked
        #[arg(long)]
        link: Option<String>,

        /// Return the message ID at once and send in the background
        #[arg(long)]
        deferred: bool,
    },
    /// Delivery statistics of a finished broadcast
    Stats { domain: String, message_id: String },
    /// Check if the service is responding
    Ping,
}

#[derive(Subcommand, Debug)]
enum ContactAction {
    /// Register a device token, replacing any previous registration
    Add {
        device_token: String,
        domain: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// List the contacts of a domain
    List {
        domain: String,
        #[arg(long)]
        email: Option<String>,
        /// Only contacts modified at or after this RFC 3339 time
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Only contacts modified at or before this RFC 3339 time
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
    /// Change the email of a registered device token
    UpdateEmail { device_token: String, email: String },
    /// Remove device tokens from the registry
    Delete {
        #[arg(required = true)]
        device_tokens: Vec<String>,
    },
}

impl ContactAction {
    fn into_command(self) -> ContactCommand {
        match self {
            Self::Add {
                device_token,
                domain,
                email,
            } => {
                let contact = Contact::new(device_token, domain);
                ContactCommand::Add(match email {
                    Some(email) => contact.with_email(email),
                    None => contact,
                })
            }
            Self::List {
                domain,
                email,
                from,
                to,
            } => ContactCommand::List(ContactFilter {
                domain,
                email,
                modified_from: from,
                modified_to: to,
            }),
            Self::UpdateEmail {
                device_token,
                email,
            } => ContactCommand::UpdateEmail {
                device_token: DeviceToken::from(device_token),
                email,
            },
            Self::Delete { device_tokens } => ContactCommand::BulkDelete(
                device_tokens.into_iter().map(DeviceToken::from).collect(),
            ),
        }
    }
}

fn check_control_socket(socket_path: &str, timeout: Duration) -> anyhow::Result<ControlClient> {
    if !Path::new(socket_path).exists() {
        anyhow::bail!(
            "No control socket at {socket_path}.\n\
             \n\
             Is pushcast running?\n\
             You can configure the socket path with --control-socket or in pushcast.config.ron"
        );
    }

    Ok(ControlClient::new(socket_path).with_timeout(timeout))
}

fn print_data(data: ResponseData) {
    match data {
        ResponseData::ContactAdded(true) => println!("Contact registered"),
        ResponseData::ContactAdded(false) => println!("Contact replaced"),
        ResponseData::Contacts(contacts) => {
            if contacts.is_empty() {
                println!("No contacts found");
                return;
            }

            println!("{:<40} {:<30} {:<25}", "DEVICE TOKEN", "EMAIL", "MODIFIED");
            println!("{}", "-".repeat(95));
            for contact in &contacts {
                println!(
                    "{:<40} {:<30} {:<25}",
                    contact.device_token,
                    contact.email.as_deref().unwrap_or("-"),
                    contact.last_modified_at.to_rfc3339(),
                );
            }
            println!("\nTotal: {} contact(s)", contacts.len());
        }
        ResponseData::Deleted(count) => println!("Deleted {count} contact(s)"),
        ResponseData::MessageId(id) => println!("Message ID: {id}"),
        ResponseData::Stats(None) => {
            println!("No statistics yet: the broadcast is unknown or still running");
        }
        ResponseData::Stats(Some(stats)) => {
            println!("Message ID:    {}", stats.message_id);
            println!("Domain:        {}", stats.domain);
            println!("Sent:          {}", stats.sent);
            println!("Delivered:     {}", stats.delivered);
            println!("Not delivered: {}", stats.not_delivered);
        }
        ResponseData::Message(message) => println!("{message}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Contact { action } => RequestCommand::Contact(action.into_command()),
        Commands::Broadcast {
            domain,
            title,
            body,
            link,
            deferred,
        } => {
            let content = MessageContent::new(title, body);
            let message = match link {
                Some(link) => content.with_link(link),
                None => content,
            };

            RequestCommand::Broadcast(if deferred {
                BroadcastCommand::Defer { domain, message }
            } else {
                BroadcastCommand::Send { domain, message }
            })
        }
        Commands::Stats { domain, message_id } => {
            let message_id: MessageId = message_id.parse()?;
            RequestCommand::Broadcast(BroadcastCommand::Stats { domain, message_id })
        }
        Commands::Ping => RequestCommand::System(SystemCommand::Ping),
    };

    let client = check_control_socket(&cli.control_socket, Duration::from_secs(cli.timeout))?;
    let response = client.send_request(Request::new(command)).await?;

    match response.into_data() {
        Some(data) => print_data(data),
        None => println!("✓ Command completed successfully"),
    }

    Ok(())
}

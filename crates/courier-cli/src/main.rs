//! Courier CLI tools: key provisioning, credential administration,
//! diagnostics.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use courier_client::{probe, ClientConfig, TransportClient};
use courier_common::Message;
use courier_crypto::{provision_key_file, Provisioned, SharedKey};
use courier_server::ArgonCredentials;

#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Courier CLI tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision the shared symmetric key file (idempotent)
    Keygen {
        /// Key file path
        #[arg(short, long, default_value = "courier.key")]
        output: PathBuf,
    },

    /// Add or update a user in the credentials file
    AddUser {
        /// Credentials file path
        #[arg(short, long, default_value = "courier-users.json")]
        file: PathBuf,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Check that a Courier server is accepting connections
    Check {
        /// Server base URL (e.g. https://127.0.0.1:3700)
        #[arg(short, long)]
        server: String,
    },

    /// Send a one-shot message to a Courier server
    Send {
        /// Server base URL
        #[arg(short, long)]
        server: String,

        /// Shared key file path
        #[arg(short, long, default_value = "courier.key")]
        key: PathBuf,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// JSON object payload, e.g. '{"test":1}'
        message: String,
    },
}

fn main() -> Result<()> {
    courier_common::init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Keygen { output } => match provision_key_file(&output)? {
            Provisioned::Created => println!("created key file {}", output.display()),
            Provisioned::AlreadyExists => {
                println!("key file {} already exists, leaving it untouched", output.display())
            }
        },
        Command::AddUser {
            file,
            username,
            password,
        } => {
            let mut credentials = if file.exists() {
                ArgonCredentials::from_file(&file)
                    .with_context(|| format!("failed to load {}", file.display()))?
            } else {
                ArgonCredentials::new()
            };
            let replaced = credentials.contains(&username);
            credentials.insert(username.as_str(), ArgonCredentials::hash_password(&password)?);
            credentials
                .save(&file)
                .with_context(|| format!("failed to write {}", file.display()))?;
            if replaced {
                println!("updated credential for {username}");
            } else {
                println!("stored credential for {username}");
            }
        }
        Command::Check { server } => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let status = rt.block_on(probe(&server, Duration::from_secs(10)))?;
            println!(
                "server is running ({} active sessions)",
                status.active_sessions
            );
        }
        Command::Send {
            server,
            key,
            username,
            password,
            message,
        } => {
            let shared_key = SharedKey::load(&key)
                .with_context(|| format!("failed to load key file {}", key.display()))?;
            let payload = Message::from_value(
                serde_json::from_str(&message).context("message is not valid JSON")?,
            )?;

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(async {
                let client =
                    TransportClient::new(ClientConfig::new(server, username, password), &shared_key)?;
                client.connect_check().await?;
                client.send(&payload).await
            })?;
            println!("message accepted");
        }
    }

    Ok(())
}

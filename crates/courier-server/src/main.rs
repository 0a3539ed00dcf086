use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_crypto::MessageCipher;
use courier_server::config::{env_bool, ServerConfig};
use courier_server::{
    AppState, ArgonCredentials, AuthProtocol, ChannelSink, SessionConfig, SessionStore,
};

fn check_public_bind_allowed(addr: SocketAddr) -> anyhow::Result<()> {
    if addr.ip().is_loopback() {
        return Ok(());
    }
    if env_bool("COURIER_ALLOW_PUBLIC_BIND", false) {
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "refusing non-loopback bind without COURIER_ALLOW_PUBLIC_BIND=1"
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "courier_server=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv::dotenv().ok();

    let config = ServerConfig::from_env();

    let key = config
        .shared_key()
        .context("failed to load shared key (set COURIER_KEY_B64 or COURIER_KEY_FILE)")?;
    let verifier = ArgonCredentials::from_file(&config.credentials_file).with_context(|| {
        format!(
            "failed to load credentials file {} (provision one with `courier add-user`)",
            config.credentials_file
        )
    })?;
    if verifier.is_empty() {
        tracing::warn!("credentials file has no users; every login will fail");
    }

    let store = Arc::new(SessionStore::new(SessionConfig {
        lifetime: config.session_lifetime,
    }));
    let auth = Arc::new(AuthProtocol::new(Arc::new(verifier), store.clone()));
    let cipher = Arc::new(MessageCipher::new(&key));

    // No consumer is attached in the standalone binary; log each message
    // the way a missing queue handler is reported.
    let (sink, mut messages) = ChannelSink::bounded(config.queue_capacity);
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            tracing::info!(?message, "received message with no queue handler set");
        }
    });

    let sweep_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let purged = sweep_store.purge_expired();
            if purged > 0 {
                tracing::info!("cleaned {} expired sessions", purged);
            }
        }
    });

    let state = AppState {
        auth,
        cipher,
        sink: Arc::new(sink),
    };

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid COURIER_BIND_ADDR {}", config.bind_addr))?;
    check_public_bind_allowed(addr)?;

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::AddrInUse => {
            let fallback_addr = SocketAddr::new(addr.ip(), 0);
            tracing::warn!(
                "bind {} is already in use, falling back to {}",
                addr,
                fallback_addr
            );
            TcpListener::bind(fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };
    let bound_addr = listener.local_addr()?;
    tracing::info!("courier server listening on {}", bound_addr);

    courier_server::serve(listener, state).await?;

    Ok(())
}

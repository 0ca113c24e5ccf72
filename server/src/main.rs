use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

use tandem_server::{transport, Config, Gateway, RoomRegistry, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tandem_server=debug,info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let addr = config.socket_addr();

    let registry = Arc::new(RoomRegistry::new(Arc::new(SystemClock)));
    let gateway = Arc::new(Gateway::new(registry));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Tandem server listening on {}", addr);

    tokio::select! {
        result = transport::serve(listener, gateway) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    Ok(())
}

//! Main entry point for the structure relay server.
//!
//! Binds the configured port and serves the WebSocket relay until the
//! process is stopped.

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use molsync::config::Config;
use molsync::error::ServerError;
use molsync::relay::{Relay, RelayHandle};
use molsync::server::serve;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::parse();
    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), ServerError> {
    info!("Starting structure relay server...");

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("Server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET /health - Health check");
    info!("  GET /ws     - Structure sync channel");

    let relay = RelayHandle::spawn(Relay::new());
    serve(listener, relay).await
}

//! Bare-transport relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                    BARE RELAY                    │
//!                       │                                                  │
//!   Client Request      │  ┌──────────┐   ┌──────────────┐                 │
//!   ────────────────────┼─▶│   http   │──▶│  transport   │─── /bare/* ─────┼──▶ Target
//!                       │  │  server  │   │  (bare.rs)   │                 │
//!                       │  └────┬─────┘   └──────────────┘                 │
//!                       │       │ absolute-form / /proxy/*                 │
//!                       │       ▼                                          │
//!                       │  ┌──────────────┐   ┌──────────────┐             │
//!                       │  │  intercept   │──▶│    engine    │─────────────┼──▶ Relay / Target
//!                       │  │  dispatch    │   │ (bare/none)  │             │
//!                       │  └──────────────┘   └──────────────┘             │
//!                       │                                                  │
//!                       │  config (+ watcher) · security::headers ·        │
//!                       │  observability · lifecycle                       │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use bare_relay::config::{load_config, watcher::ConfigWatcher, RelayConfig};
use bare_relay::lifecycle::{spawn_signal_handler, Shutdown};
use bare_relay::observability::{logging, metrics};
use bare_relay::RelayServer;

#[derive(Parser)]
#[command(name = "bare-relay")]
#[command(about = "HTTP relay exposing a bare transport endpoint", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bare-relay starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        engine = %config.intercept.engine,
        intercept_enabled = config.intercept.enabled,
        request_timeout_secs = ?config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server for reloads to keep arriving
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = RelayServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Origin-stream relay
//!
//! Serves `/{options}/plain/{source-url}` by fetching the source from its
//! origin and streaming it back unmodified.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request     ┌─────────┐    ┌─────────┐    ┌──────────────┐
//!     ──────────────────▶│  http   │───▶│ options │───▶│    relay     │──── GET ───▶ Origin
//!                        │ server  │    │ parser  │    │   session    │
//!     Client Response    └─────────┘    └─────────┘    └──────┬───────┘
//!     ◀───────────────── headers (allow-list, metadata, cache) │
//!     ◀───────────────── body (pooled 4 KiB copy loop) ◀───────┘
//!
//!     Cross-cutting: config (+ watcher) · observability · lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use origin_relay::config::loader::load_config;
use origin_relay::config::watcher::ConfigWatcher;
use origin_relay::lifecycle::{wait_for_signal, Shutdown};
use origin_relay::observability::{logging::init_logging, metrics::init_metrics};
use origin_relay::{HttpServer, RelayConfig};

#[derive(Parser)]
#[command(name = "origin-relay")]
#[command(version, about = "Streams source images from their origin", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!("origin-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        path_prefix = %config.server.path_prefix,
        request_timeout_secs = config.server.request_timeout_secs,
        cookie_passthrough = config.cookies.passthrough,
        cache_passthrough = config.cache.passthrough,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher stops when dropped, so it lives as long as main.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

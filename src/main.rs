//! spa-gateway: reverse proxy and static host for single-page applications.
//!
//! ```text
//!     Client ──▶ net::Listener ──▶ http::server ──▶ routing::RouteTable
//!                                                      │
//!                         ┌────────────────────────────┴──────────────┐
//!                         ▼                                           ▼
//!               http::dispatch ──▶ upstream             static_files (index fallback)
//! ```

use std::path::PathBuf;

use clap::Parser;

use spa_gateway::config::{load_effective_config, Overrides};
use spa_gateway::lifecycle::{startup, StartupOptions};
use spa_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "spa-gateway")]
#[command(about = "Reverse proxy and static file server for single-page applications", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.port`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override `static_files.root`.
    #[arg(long)]
    static_root: Option<PathBuf>,

    /// Reload routes when the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let overrides = Overrides {
        port: args.port,
        static_root: args.static_root,
    };
    let config = load_effective_config(args.config.as_deref(), &overrides)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "spa-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_connections = config.listener.max_connections,
        connect_timeout_ms = config.timeouts.connect_ms,
        response_timeout_secs = config.timeouts.response_secs,
        static_root = ?config.static_files.root,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_socket_addr() {
            Some(addr) => metrics::init_metrics(addr),
            None => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let options = StartupOptions {
        config_path: args.config,
        watch: args.watch,
        overrides,
    };
    startup::run(config, options).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the configuration into routing state
//! - Start background tasks (config watcher, signals, admin API)
//! - Bind the listener and serve until shutdown
//! - Bound the connection drain after shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::{serve_admin, AdminState};
use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigError, GatewayConfig, Overrides};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::ListenerError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Failed to watch configuration file: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How the gateway was launched.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// File the configuration came from; enables SIGHUP and admin reloads.
    pub config_path: Option<PathBuf>,
    /// Reload automatically when the file changes.
    pub watch: bool,
    /// Command-line settings applied again on every reload.
    pub overrides: Overrides,
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(config: GatewayConfig, options: StartupOptions) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    signals::spawn_shutdown_handler(shutdown.clone());
    serve(config, options, shutdown).await
}

/// Run the gateway until `shutdown` is triggered.
pub async fn serve(
    config: GatewayConfig,
    options: StartupOptions,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let server = HttpServer::new(&config)?;
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    // Dropping the watcher stops it, so keep it for the life of the server.
    let _watcher = match (&options.config_path, options.watch) {
        (Some(path), true) => Some(
            ConfigWatcher::new(path, options.overrides.clone(), update_tx.clone()).run()?,
        ),
        _ => None,
    };
    if let Some(path) = &options.config_path {
        signals::spawn_reload_handler(path.clone(), options.overrides.clone(), update_tx.clone())?;
    }

    if config.admin.enabled {
        let address = config.admin.bind_address.clone();
        let admin_listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ListenerError::Bind { address, source })?;
        let admin_state = AdminState::new(
            server.state(),
            config.admin.api_key.clone(),
            options.config_path.clone(),
            options.overrides.clone(),
        );
        let admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = serve_admin(admin_listener, admin_state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;
    tracing::info!(
        address = %listener.local_addr()?,
        routes = config.routes.len(),
        upstreams = config.upstreams.len(),
        "Gateway ready"
    );

    let connections = server.connections();
    let mut stopped = shutdown.subscribe();
    let mut server_task = tokio::spawn(server.run(listener, update_rx, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => return flatten(result),
        _ = stopped.recv() => {}
    }

    let drain_deadline = config.timeouts.response();
    if !connections.wait_for_idle(drain_deadline).await {
        tracing::warn!(
            active_connections = connections.active_count(),
            deadline = ?drain_deadline,
            "Drain deadline reached, closing remaining connections"
        );
        server_task.abort();
        return Ok(());
    }
    flatten(server_task.await)
}

fn flatten(result: Result<io::Result<()>, tokio::task::JoinError>) -> Result<(), StartupError> {
    match result {
        Ok(inner) => Ok(inner?),
        Err(e) => Err(io::Error::other(e).into()),
    }
}

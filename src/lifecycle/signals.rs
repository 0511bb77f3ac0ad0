//! OS signal handling.
//!
//! # Responsibilities
//! - SIGINT/SIGTERM trigger graceful shutdown; a second one exits immediately
//! - SIGHUP re-reads the configuration file and feeds it to the server
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown

use std::io;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{load_effective_config, GatewayConfig, Overrides};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Wait for SIGINT or SIGTERM.
pub async fn terminate_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Trigger `shutdown` on the first termination signal and force exit on the second.
pub fn spawn_shutdown_handler(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = terminate_signal().await {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return;
        }
        tracing::info!("Shutdown signal received, draining connections");
        shutdown.trigger();

        if terminate_signal().await.is_ok() {
            tracing::warn!("Second shutdown signal received, exiting immediately");
            std::process::exit(130);
        }
    })
}

/// Reload `path`, with `overrides` applied, into `updates` on every SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_handler(
    path: PathBuf,
    overrides: Overrides,
    updates: mpsc::UnboundedSender<GatewayConfig>,
) -> io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            tracing::info!(path = %path.display(), "SIGHUP received, reloading configuration");
            match load_effective_config(Some(&path), &overrides) {
                Ok(config) => {
                    if updates.send(config).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    metrics::record_config_reload(false);
                    tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                }
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_reload_handler(
    _path: PathBuf,
    _overrides: Overrides,
    _updates: mpsc::UnboundedSender<GatewayConfig>,
) -> io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}

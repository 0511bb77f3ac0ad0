//! Admin API.
//!
//! Read-only views of the running configuration plus a reload trigger,
//! served on a separate listener behind a bearer token.

pub mod auth;
pub mod handlers;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::Overrides;
use crate::http::AppState;

/// State for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub app: AppState,
    pub api_key: Arc<String>,
    pub config_path: Option<PathBuf>,
    /// Re-applied to the file on `POST /admin/reload`.
    pub overrides: Overrides,
}

impl AdminState {
    pub fn new(
        app: AppState,
        api_key: impl Into<String>,
        config_path: Option<PathBuf>,
        overrides: Overrides,
    ) -> Self {
        Self {
            app,
            api_key: Arc::new(api_key.into()),
            config_path,
            overrides,
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/upstreams", get(get_upstreams))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API until `shutdown` fires.
pub async fn serve_admin(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}

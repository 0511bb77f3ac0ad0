//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway handler
//! - Wire up middleware (request ID, tracing, body limit)
//! - Serve on the bounded listener with graceful shutdown
//! - Apply configuration updates to the shared routing state
//! - Dispatch each request to an upstream or the static fallback

use std::io;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::{ConfigError, GatewayConfig, ListenerConfig};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::method_not_allowed;
use crate::http::state::{AppState, RoutingState};
use crate::net::{ClientAddr, ConnectionTracker, Listener};
use crate::observability::metrics;
use crate::routing::{RouteMatch, RouteTarget};
use crate::static_files::StaticError;

/// Metrics label for requests answered by the static fallback.
const STATIC_TARGET: &str = "static";

/// HTTP server for the gateway.
pub struct HttpServer {
    state: AppState,
    listener_config: ListenerConfig,
}

impl HttpServer {
    /// Compile `config` into routing state. Fails on an invalid route table
    /// or upstream definition.
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            state: AppState::new(config)?,
            listener_config: config.listener.clone(),
        })
    }

    /// Shared state, for the admin API and tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn connections(&self) -> ConnectionTracker {
        self.state.connections.clone()
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.listener_config.max_body_bytes)
    }

    /// Run the server until `shutdown` fires, applying configs received on
    /// `config_updates` as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let running_listener = self.listener_config.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => {
                        let Some(config) = update else { break };
                        if config.listener != running_listener {
                            tracing::warn!("Listener settings changed; restart to apply them");
                        }
                        if let Err(e) = state.reload(&config) {
                            tracing::error!(error = %e, "Rejected configuration update, keeping current routes");
                        }
                    }
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        let listener = Listener::from_tcp(listener, self.listener_config.max_connections)
            .with_tracker(self.state.connections.clone());
        let app = self.router().into_make_service_with_connect_info::<ClientAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server no longer accepting connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(set_request_id_layer())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request.headers()),
                )
            }),
        )
        .layer(propagate_request_id_layer())
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    Router::new()
        .fallback(gateway_handler)
        .with_state(state)
        .layer(middleware)
}

/// Main gateway handler.
/// Matches the path, then forwards to an upstream or serves a static asset.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(ClientAddr(client_addr)): ConnectInfo<ClientAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let routing = state.routing();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let (target, response) = match routing.routes.match_path(&path) {
        RouteMatch::Matched(route) => match route.target() {
            RouteTarget::Upstream(name) => {
                let scheme = request.uri().scheme_str().unwrap_or("http").to_string();
                let response = match routing
                    .dispatcher
                    .dispatch(request, route, &routing.upstreams, client_addr, &scheme)
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        metrics::record_upstream_error(name, e.kind());
                        tracing::warn!(
                            request_id = %request_id,
                            upstream = %name,
                            error = %e,
                            "Upstream dispatch failed"
                        );
                        e.into_response()
                    }
                };
                (name.as_str(), response)
            }
            RouteTarget::Static => (
                STATIC_TARGET,
                serve_static(&routing, &method, &path, &request_id).await,
            ),
        },
        RouteMatch::NotFound => (
            STATIC_TARGET,
            serve_static(&routing, &method, &path, &request_id).await,
        ),
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), target, start);
    response
}

async fn serve_static(routing: &RoutingState, method: &Method, path: &str, request_id: &str) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return method_not_allowed();
    }

    let Some(files) = &routing.static_files else {
        tracing::debug!(request_id = %request_id, path = %path, "No static root configured");
        return StaticError::AssetMissing { path: path.to_string() }.into_response();
    };

    match files.serve(path, method == Method::HEAD).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Static asset not served");
            e.into_response()
        }
    }
}

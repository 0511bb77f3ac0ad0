use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::config::{load_effective_config, MatchKind};
use crate::routing::RouteTarget;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub generation: u64,
    pub routes: usize,
    pub upstreams: usize,
    pub active_connections: u64,
    pub static_root: Option<String>,
}

#[derive(Serialize)]
pub struct RouteStatus {
    pub order: usize,
    pub path: String,
    #[serde(rename = "match")]
    pub match_kind: MatchKind,
    pub target: RouteTarget,
    pub rewrite: Option<String>,
}

#[derive(Serialize)]
pub struct UpstreamStatus {
    pub name: String,
    pub url: String,
    pub capacity: usize,
    pub in_flight: usize,
}

#[derive(Serialize)]
pub struct ReloadResult {
    pub generation: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let routing = state.app.routing();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        generation: routing.generation,
        routes: routing.routes.len(),
        upstreams: routing.upstreams.len(),
        active_connections: state.app.connections.active_count(),
        static_root: routing
            .static_files
            .as_ref()
            .map(|files| files.root().display().to_string()),
    })
}

/// Routes in match order.
pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteStatus>> {
    let routing = state.app.routing();
    let routes = routing
        .routes
        .entries()
        .iter()
        .enumerate()
        .map(|(order, route)| RouteStatus {
            order,
            path: route.path_pattern().to_string(),
            match_kind: route.match_kind(),
            target: route.target().clone(),
            rewrite: route.rewrite_prefix().map(str::to_string),
        })
        .collect();
    Json(routes)
}

pub async fn get_upstreams(State(state): State<AdminState>) -> Json<Vec<UpstreamStatus>> {
    let routing = state.app.routing();
    let upstreams = routing
        .upstreams
        .all()
        .map(|u| UpstreamStatus {
            name: u.name().to_string(),
            url: u.base_url().to_string(),
            capacity: u.capacity(),
            in_flight: u.in_flight(),
        })
        .collect();
    Json(upstreams)
}

/// Re-read the configuration file and apply it.
pub async fn post_reload(
    State(state): State<AdminState>,
) -> Result<Json<ReloadResult>, (StatusCode, String)> {
    let Some(path) = state.config_path.as_deref() else {
        return Err((
            StatusCode::CONFLICT,
            "gateway was started without a configuration file".to_string(),
        ));
    };

    let config = load_effective_config(Some(path), &state.overrides)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let generation = state
        .app
        .reload(&config)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!(generation, path = %path.display(), "Configuration reloaded via admin API");
    Ok(Json(ReloadResult { generation }))
}

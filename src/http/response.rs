//! Gateway-generated responses.
//!
//! # Responsibilities
//! - Map dispatch and static-asset errors to HTTP status codes
//! - Build the 405 answer for non-GET requests that reach the static fallback
//!
//! # Design Decisions
//! - Plain-text bodies; upstream error details stay in the logs
//! - Backend timeouts result in 504 Gateway Timeout

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::dispatch::DispatchError;
use crate::static_files::StaticError;

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            DispatchError::UpstreamUnreachable { .. } => "Upstream unreachable",
            DispatchError::UpstreamTimeout { .. } => "Upstream timed out",
            DispatchError::UpstreamSaturated { .. } => "Upstream busy",
            DispatchError::NoUpstream(_)
            | DispatchError::UnknownUpstream(_)
            | DispatchError::InvalidRequest(_) => "Gateway misconfigured",
        };
        (status, message).into_response()
    }
}

impl IntoResponse for StaticError {
    fn into_response(self) -> Response {
        match self {
            StaticError::AssetMissing { .. } => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}

/// 405 for methods the static fallback does not serve.
pub fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, HEAD")],
        "Method Not Allowed",
    )
        .into_response()
}

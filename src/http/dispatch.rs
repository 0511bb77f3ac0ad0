//! Upstream dispatch.
//!
//! # Responsibilities
//! - Resolve the route's upstream and take one of its request slots
//! - Rewrite the path, forward headers, and send the request
//! - Map connect failures and timeouts to distinct errors
//!
//! # Design Decisions
//! - Requests are never retried; a failed POST must not be replayed
//! - Bodies stream in both directions; nothing is buffered
//! - The upstream slot is held until the response body is dropped

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode, Version};
use hyper::body::{Frame, Incoming, SizeHint};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::{PoolConfig, TimeoutConfig};
use crate::http::headers::{apply_forwarded_headers, strip_hop_by_hop};
use crate::http::request::request_id;
use crate::routing::Route;
use crate::upstream::{UpstreamPermit, UpstreamTable};

/// Shared HTTP/1.1 client with a keep-alive pool per upstream authority.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Error type for a failed dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("route '{0}' has no upstream")]
    NoUpstream(String),

    #[error("unknown upstream '{0}'")]
    UnknownUpstream(String),

    #[error("upstream '{upstream}' unreachable: {reason}")]
    UpstreamUnreachable { upstream: String, reason: String },

    #[error("upstream '{upstream}' did not respond within {timeout:?}")]
    UpstreamTimeout { upstream: String, timeout: Duration },

    #[error("upstream '{upstream}' has no free request slot")]
    UpstreamSaturated { upstream: String },

    #[error("cannot build forwarded request: {0}")]
    InvalidRequest(String),
}

impl DispatchError {
    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::UpstreamSaturated { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::NoUpstream(_)
            | DispatchError::UnknownUpstream(_)
            | DispatchError::InvalidRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NoUpstream(_) => "no_upstream",
            DispatchError::UnknownUpstream(_) => "unknown_upstream",
            DispatchError::UpstreamUnreachable { .. } => "unreachable",
            DispatchError::UpstreamTimeout { .. } => "timeout",
            DispatchError::UpstreamSaturated { .. } => "saturated",
            DispatchError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Forwards matched requests to their upstreams.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: UpstreamClient,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeouts: &TimeoutConfig, pool: &PoolConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(pool.max_idle_per_upstream)
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .build(connector);

        Self {
            client,
            connect_timeout: timeouts.connect(),
            response_timeout: timeouts.response(),
        }
    }

    /// Forward `request` to the upstream named by `route`.
    ///
    /// `scheme` is the scheme the client used, reported as X-Forwarded-Proto.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        route: &Route,
        upstreams: &UpstreamTable,
        client_addr: SocketAddr,
        scheme: &str,
    ) -> Result<Response<Body>, DispatchError> {
        let upstream_name = route
            .upstream_name()
            .ok_or_else(|| DispatchError::NoUpstream(route.path_pattern().to_string()))?;
        let upstream = upstreams
            .get(upstream_name)
            .ok_or_else(|| DispatchError::UnknownUpstream(upstream_name.to_string()))?;

        let permit = upstream.acquire(self.connect_timeout).await.ok_or_else(|| {
            DispatchError::UpstreamSaturated {
                upstream: upstream_name.to_string(),
            }
        })?;

        let (mut parts, body) = request.into_parts();

        let forward_path = route.forward_path(parts.uri.path());
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{forward_path}?{query}"),
            None => forward_path,
        };
        let target = permit
            .uri_for(&path_and_query)
            .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;

        // HTTP/2 clients carry the host in the URI authority only.
        if !parts.headers.contains_key(header::HOST) {
            if let Some(authority) = parts.uri.authority() {
                if let Ok(host) = authority.as_str().parse() {
                    parts.headers.insert(header::HOST, host);
                }
            }
        }
        strip_hop_by_hop(&mut parts.headers);
        apply_forwarded_headers(&mut parts.headers, client_addr.ip(), scheme);

        tracing::debug!(
            request_id = %request_id(&parts.headers),
            method = %parts.method,
            upstream = %upstream_name,
            target = %target,
            "Forwarding request"
        );

        parts.uri = target;
        parts.version = Version::HTTP_11;
        let outbound = Request::from_parts(parts, body);

        let response = match tokio::time::timeout(self.response_timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(DispatchError::UpstreamUnreachable {
                    upstream: upstream_name.to_string(),
                    reason: error_chain(&e),
                });
            }
            Err(_) => {
                return Err(DispatchError::UpstreamTimeout {
                    upstream: upstream_name.to_string(),
                    timeout: self.response_timeout,
                });
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(
            parts,
            Body::new(PermitBody {
                inner: body,
                _permit: permit,
            }),
        ))
    }
}

/// Upstream response body that releases the upstream slot when dropped.
struct PermitBody {
    inner: Incoming,
    _permit: UpstreamPermit,
}

impl hyper::body::Body for PermitBody {
    type Data = hyper::body::Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        hyper::body::Body::poll_frame(Pin::new(&mut self.get_mut().inner), cx)
    }

    fn is_end_stream(&self) -> bool {
        hyper::body::Body::is_end_stream(&self.inner)
    }

    fn size_hint(&self) -> SizeHint {
        hyper::body::Body::size_hint(&self.inner)
    }
}

/// Render an error with its sources, e.g. "client error (Connect): tcp connect error: Connection refused".
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_per_error() {
        let unreachable = DispatchError::UpstreamUnreachable {
            upstream: "backend".into(),
            reason: "refused".into(),
        };
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(unreachable.kind(), "unreachable");

        let timeout = DispatchError::UpstreamTimeout {
            upstream: "backend".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let saturated = DispatchError::UpstreamSaturated {
            upstream: "backend".into(),
        };
        assert_eq!(saturated.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            DispatchError::UnknownUpstream("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_chain_includes_sources() {
        #[derive(Debug, Error)]
        #[error("outer")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(error_chain(&err), "outer: refused");
    }
}

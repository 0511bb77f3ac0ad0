//! Upstream abstraction.
//!
//! # Responsibilities
//! - Represent a single named upstream service (host:port)
//! - Bound in-flight requests with a per-upstream semaphore
//! - Build forwarding URIs against the upstream authority

use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::uri::{Authority, PathAndQuery, Scheme, Uri};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::config::validation::upstream_base_url;
use crate::config::{ConfigError, UpstreamConfig, ValidationError};

/// A single upstream service.
#[derive(Debug)]
pub struct Upstream {
    name: String,
    /// Pre-calculated base URL, e.g. `http://backend:5000/`.
    base_url: Url,
    authority: Authority,
    capacity: usize,
    limiter: Arc<Semaphore>,
}

impl Upstream {
    /// Create an upstream allowing `capacity` concurrent requests.
    pub fn new(config: &UpstreamConfig, capacity: usize) -> Result<Self, ConfigError> {
        let invalid = || {
            ConfigError::Validation(vec![ValidationError::InvalidUpstreamHost {
                name: config.name.clone(),
                host: config.host.clone(),
            }])
        };

        let base_url = upstream_base_url(&config.host, config.port).ok_or_else(invalid)?;
        let host = base_url.host_str().ok_or_else(invalid)?;
        let authority =
            Authority::from_str(&format!("{}:{}", host, config.port)).map_err(|_| invalid())?;

        Ok(Self {
            name: config.name.clone(),
            base_url,
            authority,
            capacity,
            limiter: Arc::new(Semaphore::new(capacity)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `host:port` as sent on the wire.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.limiter.available_permits()
    }

    /// Wait up to `wait` for a request slot. Only the calling task waits.
    pub async fn acquire(self: &Arc<Self>, wait: Duration) -> Option<UpstreamPermit> {
        let permit = tokio::time::timeout(wait, self.limiter.clone().acquire_owned())
            .await
            .ok()?
            .ok()?;

        Some(UpstreamPermit {
            upstream: self.clone(),
            _permit: permit,
        })
    }

    /// Absolute URI for `path_and_query` on this upstream.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        let path_and_query = PathAndQuery::from_str(path_and_query)?;
        Ok(Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

/// A RAII guard holding one of the upstream's request slots.
#[derive(Debug)]
pub struct UpstreamPermit {
    upstream: Arc<Upstream>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for UpstreamPermit {
    type Target = Upstream;
    fn deref(&self) -> &Self::Target {
        &self.upstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(capacity: usize) -> Arc<Upstream> {
        Arc::new(Upstream::new(&UpstreamConfig::new("backend", "backend", 5000), capacity).unwrap())
    }

    #[test]
    fn builds_forwarding_uri() {
        let upstream = upstream(1);
        assert_eq!(upstream.authority().as_str(), "backend:5000");
        assert_eq!(upstream.base_url().as_str(), "http://backend:5000/");

        let uri = upstream.uri_for("/users?page=2").unwrap();
        assert_eq!(uri.to_string(), "http://backend:5000/users?page=2");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let upstream = Upstream::new(&UpstreamConfig::new("v6", "::1", 8080), 1).unwrap();
        assert_eq!(upstream.authority().as_str(), "[::1]:8080");
    }

    #[test]
    fn rejects_invalid_host() {
        let err = Upstream::new(&UpstreamConfig::new("bad", "not a host", 80), 1).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[tokio::test]
    async fn permits_bound_in_flight_requests() {
        let upstream = upstream(1);

        let first = upstream.acquire(Duration::from_millis(50)).await;
        assert!(first.is_some());
        assert_eq!(upstream.in_flight(), 1);

        let second = upstream.acquire(Duration::from_millis(50)).await;
        assert!(second.is_none(), "second request must wait and time out");

        drop(first);
        assert_eq!(upstream.in_flight(), 0);
        assert!(upstream.acquire(Duration::from_millis(50)).await.is_some());
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from TOML files.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (address, port, connection cap).
    pub listener: ListenerConfig,

    /// Static single-page application assets.
    pub static_files: StaticFilesConfig,

    /// Route definitions, in declaration order.
    pub routes: Vec<RouteConfig>,

    /// Named upstream services.
    pub upstreams: Vec<UpstreamConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Upstream connection pool settings.
    pub pool: PoolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub address: String,

    /// Listen port.
    pub port: u16,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl ListenerConfig {
    /// The `address:port` pair to bind.
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Static file fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory holding the built application. `None` disables the fallback.
    pub root: Option<PathBuf>,

    /// File served for client-side routes.
    pub index: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: None,
            index: "index.html".to_string(),
        }
    }
}

/// How a route's path pattern is compared with the request path.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Pattern is a prefix of the request path.
    #[default]
    Prefix,
    /// Pattern equals the request path.
    Exact,
}

/// Route configuration mapping a path pattern to an upstream or the static root.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Path pattern, e.g. "/api/".
    pub path: String,

    /// Prefix or exact comparison.
    #[serde(default, rename = "match")]
    pub match_kind: MatchKind,

    /// Named upstream to forward to. Absent means "serve from the static root".
    #[serde(default)]
    pub upstream: Option<String>,

    /// Replacement for the matched prefix before forwarding.
    #[serde(default)]
    pub rewrite: Option<String>,
}

impl RouteConfig {
    /// Prefix route to an upstream.
    pub fn prefix(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            match_kind: MatchKind::Prefix,
            upstream: Some(upstream.into()),
            rewrite: None,
        }
    }

    /// Prefix route serving the static root.
    pub fn static_root(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            match_kind: MatchKind::Prefix,
            upstream: None,
            rewrite: None,
        }
    }

    /// Set the rewrite prefix.
    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }

    /// Switch to exact matching.
    pub fn exact(mut self) -> Self {
        self.match_kind = MatchKind::Exact;
        self
    }
}

/// Upstream service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UpstreamConfig {
    /// Unique upstream identifier referenced by routes.
    pub name: String,

    /// Hostname or IP (e.g., "backend" inside a compose network).
    pub host: String,

    /// Upstream port.
    pub port: u16,
}

impl UpstreamConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Time allowed for the upstream response head, in seconds.
    pub response_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn response(&self) -> Duration {
        Duration::from_secs(self.response_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 2_000,
            response_secs: 30,
        }
    }
}

/// Upstream connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum in-flight requests per upstream.
    pub max_connections_per_upstream: usize,

    /// Maximum idle keep-alive connections kept per upstream.
    pub max_idle_per_upstream: usize,

    /// Idle keep-alive connection lifetime in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_upstream: 100,
            max_idle_per_upstream: 32,
            idle_timeout_secs: 90,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    pub fn metrics_socket_addr(&self) -> Option<SocketAddr> {
        self.metrics_address.parse().ok()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: placeholder, override in any shared environment.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let doc = r#"
            [listener]
            port = 9000

            [static_files]
            root = "./dist"

            [[upstreams]]
            name = "backend"
            host = "backend"
            port = 5000

            [[routes]]
            path = "/api/"
            upstream = "backend"
            rewrite = "/"

            [[routes]]
            path = "/healthz"
            match = "exact"
            upstream = "backend"

            [[routes]]
            path = "/"
        "#;

        let config: GatewayConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.address, "0.0.0.0");
        assert_eq!(config.static_files.root, Some(PathBuf::from("./dist")));
        assert_eq!(config.static_files.index, "index.html");
        assert_eq!(config.routes.len(), 3);
        assert_eq!(config.routes[0].rewrite.as_deref(), Some("/"));
        assert_eq!(config.routes[1].match_kind, MatchKind::Exact);
        assert_eq!(config.routes[2].upstream, None);
        assert_eq!(config.upstreams[0], UpstreamConfig::new("backend", "backend", 5000));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.timeouts.connect(), Duration::from_secs(2));
    }

    #[test]
    fn ipv6_bind_address_is_bracketed() {
        let listener = ListenerConfig {
            address: "::1".into(),
            port: 80,
            ..ListenerConfig::default()
        };
        assert_eq!(listener.bind_address(), "[::1]:80");
    }
}

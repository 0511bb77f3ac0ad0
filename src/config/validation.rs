//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing upstreams)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig, UpstreamConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route path '{0}' is declared more than once")]
    DuplicateRoute(String),

    #[error("route path '{0}' must start with '/'")]
    InvalidRoutePath(String),

    #[error("route '{path}' rewrite '{rewrite}' must be empty or start with '/'")]
    InvalidRewrite { path: String, rewrite: String },

    #[error("route '{0}' has a rewrite but no upstream")]
    RewriteWithoutUpstream(String),

    #[error("route '{path}' references unknown upstream '{upstream}'")]
    UnknownUpstream { path: String, upstream: String },

    #[error("upstream '{0}' is declared more than once")]
    DuplicateUpstream(String),

    #[error("upstream '{0}' has an empty host")]
    EmptyUpstreamHost(String),

    #[error("upstream '{name}' host '{host}' is not a valid hostname")]
    InvalidUpstreamHost { name: String, host: String },

    #[error("upstream '{0}' has port 0")]
    InvalidUpstreamPort(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_routes(&config.routes);
    errors.extend(validate_upstreams(&config.upstreams));

    let upstream_names: HashSet<&str> = config.upstreams.iter().map(|u| u.name.as_str()).collect();
    for route in &config.routes {
        if let Some(upstream) = &route.upstream {
            if !upstream_names.contains(upstream.as_str()) {
                errors.push(ValidationError::UnknownUpstream {
                    path: route.path.clone(),
                    upstream: upstream.clone(),
                });
            }
        }
    }

    let ranges = [
        (config.listener.port as u64, "listener.port"),
        (config.listener.max_connections as u64, "listener.max_connections"),
        (config.listener.max_body_bytes as u64, "listener.max_body_bytes"),
        (config.timeouts.connect_ms, "timeouts.connect_ms"),
        (config.timeouts.response_secs, "timeouts.response_secs"),
        (config.pool.max_connections_per_upstream as u64, "pool.max_connections_per_upstream"),
    ];
    for (value, field) in ranges {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Route-local checks shared with route table construction.
pub fn validate_routes(routes: &[RouteConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for route in routes {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::InvalidRoutePath(route.path.clone()));
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.path.clone()));
        }
        if let Some(rewrite) = &route.rewrite {
            if route.upstream.is_none() {
                errors.push(ValidationError::RewriteWithoutUpstream(route.path.clone()));
            }
            if !rewrite.is_empty() && !rewrite.starts_with('/') {
                errors.push(ValidationError::InvalidRewrite {
                    path: route.path.clone(),
                    rewrite: rewrite.clone(),
                });
            }
        }
    }

    errors
}

fn validate_upstreams(upstreams: &[UpstreamConfig]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for upstream in upstreams {
        if !seen.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
        if upstream.host.trim().is_empty() {
            errors.push(ValidationError::EmptyUpstreamHost(upstream.name.clone()));
        } else if upstream_base_url(&upstream.host, upstream.port).is_none() {
            errors.push(ValidationError::InvalidUpstreamHost {
                name: upstream.name.clone(),
                host: upstream.host.clone(),
            });
        }
        if upstream.port == 0 {
            errors.push(ValidationError::InvalidUpstreamPort(upstream.name.clone()));
        }
    }

    errors
}

/// `http://host:port/` for an upstream, or `None` if the host is not usable in a URL.
pub fn upstream_base_url(host: &str, port: u16) -> Option<Url> {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    let url = Url::parse(&format!("http://{host}:{port}/")).ok()?;
    let path_is_root = url.path() == "/" && url.query().is_none() && url.fragment().is_none();
    (url.host().is_some() && path_is_root && url.username().is_empty()).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, UpstreamConfig};

    fn base_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstreams.push(UpstreamConfig::new("backend", "backend", 5000));
        config.routes.push(RouteConfig::prefix("/api/", "backend").with_rewrite("/"));
        config.routes.push(RouteConfig::static_root("/"));
        config
    }

    #[test]
    fn accepts_valid_config() {
        assert_eq!(validate_config(&base_config()), Ok(()));
    }

    #[test]
    fn rejects_duplicate_route_paths() {
        let mut config = base_config();
        config.routes.push(RouteConfig::prefix("/api/", "backend").exact());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateRoute("/api/".into())]);
    }

    #[test]
    fn reports_every_problem() {
        let mut config = base_config();
        config.routes.push(RouteConfig::prefix("users", "missing"));
        config.upstreams.push(UpstreamConfig::new("backend", "", 0));
        config.timeouts.connect_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidRoutePath("users".into())));
        assert!(errors.contains(&ValidationError::DuplicateUpstream("backend".into())));
        assert!(errors.contains(&ValidationError::EmptyUpstreamHost("backend".into())));
        assert!(errors.contains(&ValidationError::InvalidUpstreamPort("backend".into())));
        assert!(errors.contains(&ValidationError::UnknownUpstream {
            path: "users".into(),
            upstream: "missing".into(),
        }));
        assert!(errors.contains(&ValidationError::Zero("timeouts.connect_ms")));
    }

    #[test]
    fn rejects_unusable_upstream_hosts() {
        let mut config = base_config();
        config.upstreams.push(UpstreamConfig::new("broken", "bad host/path", 80));
        config.upstreams.push(UpstreamConfig::new("v6", "::1", 80));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidUpstreamHost {
                name: "broken".into(),
                host: "bad host/path".into(),
            }]
        );
    }

    #[test]
    fn rewrite_needs_upstream_and_leading_slash() {
        let routes = vec![
            RouteConfig::static_root("/app/").with_rewrite("/"),
            RouteConfig::prefix("/api/", "backend").with_rewrite("v1/"),
        ];

        let errors = validate_routes(&routes);
        assert_eq!(
            errors,
            vec![
                ValidationError::RewriteWithoutUpstream("/app/".into()),
                ValidationError::InvalidRewrite {
                    path: "/api/".into(),
                    rewrite: "v1/".into(),
                },
            ]
        );
    }
}

//! Route table and lookup.
//!
//! # Responsibilities
//! - Compile route configs into an ordered, immutable table
//! - Look up the best route for a request path
//! - Return matched route or explicit NotFound
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Entries sorted once: longest pattern first, declaration order on ties
//! - O(n) scan; the first hit is the longest match
//! - Explicit NotFound rather than silent default

use serde::Serialize;

use crate::config::{ConfigError, MatchKind, RouteConfig};
use crate::config::validation::validate_routes;
use crate::routing::matcher::PathMatcher;

/// Where a matched request goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum RouteTarget {
    /// Forward to the named upstream.
    Upstream(String),
    /// Serve from the static root.
    Static,
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: PathMatcher,
    target: RouteTarget,
    rewrite: Option<String>,
    declared_at: usize,
}

impl Route {
    pub fn path_pattern(&self) -> &str {
        self.matcher.pattern()
    }

    pub fn match_kind(&self) -> MatchKind {
        self.matcher.kind()
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    /// Name of the upstream this route forwards to, if any.
    pub fn upstream_name(&self) -> Option<&str> {
        match &self.target {
            RouteTarget::Upstream(name) => Some(name.as_str()),
            RouteTarget::Static => None,
        }
    }

    pub fn rewrite_prefix(&self) -> Option<&str> {
        self.rewrite.as_deref()
    }

    /// Position of this route in the original configuration.
    pub fn declared_at(&self) -> usize {
        self.declared_at
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// The path to send upstream: rewritten when a rewrite is configured.
    pub fn forward_path(&self, path: &str) -> String {
        self.rewrite
            .as_deref()
            .and_then(|replacement| self.matcher.rewrite(path, replacement))
            .unwrap_or_else(|| path.to_string())
    }
}

/// Result of matching a path against the table.
#[derive(Debug, Clone, Copy)]
pub enum RouteMatch<'a> {
    Matched(&'a Route),
    NotFound,
}

impl<'a> RouteMatch<'a> {
    pub fn route(self) -> Option<&'a Route> {
        match self {
            RouteMatch::Matched(route) => Some(route),
            RouteMatch::NotFound => None,
        }
    }
}

/// Immutable ordered collection of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<Route>,
}

impl RouteTable {
    /// Compile route configs. Fails on identical path patterns or malformed routes.
    pub fn load(configs: &[RouteConfig]) -> Result<Self, ConfigError> {
        let errors = validate_routes(configs);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        let mut entries: Vec<Route> = configs
            .iter()
            .enumerate()
            .map(|(declared_at, config)| Route {
                matcher: PathMatcher::new(config.path.clone(), config.match_kind),
                target: match &config.upstream {
                    Some(name) => RouteTarget::Upstream(name.clone()),
                    None => RouteTarget::Static,
                },
                rewrite: config.rewrite.clone(),
                declared_at,
            })
            .collect();

        // Stable sort keeps declaration order for equal lengths.
        entries.sort_by(|a, b| b.path_pattern().len().cmp(&a.path_pattern().len()));

        Ok(Self { entries })
    }

    /// Routes in evaluation order.
    pub fn entries(&self) -> &[Route] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the best route for `path`.
    pub fn match_path(&self, path: &str) -> RouteMatch<'_> {
        self.entries
            .iter()
            .find(|route| route.matches(path))
            .map_or(RouteMatch::NotFound, RouteMatch::Matched)
    }
}

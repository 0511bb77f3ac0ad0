//! Path matching logic.
//!
//! # Responsibilities
//! - Compare a request path with a route pattern (prefix or exact)
//! - Replace the matched prefix when a route rewrites
//!
//! # Design Decisions
//! - Path matching is case-sensitive and byte-wise
//! - No regex, no normalization: the pattern is compared as written
//! - The query string never takes part in matching

use crate::config::MatchKind;

/// A compiled path condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatcher {
    pattern: String,
    kind: MatchKind,
}

impl PathMatcher {
    pub fn new(pattern: impl Into<String>, kind: MatchKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }

    pub fn prefix(pattern: impl Into<String>) -> Self {
        Self::new(pattern, MatchKind::Prefix)
    }

    pub fn exact(pattern: impl Into<String>) -> Self {
        Self::new(pattern, MatchKind::Exact)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    /// Returns true if `path` satisfies this condition.
    pub fn matches(&self, path: &str) -> bool {
        match self.kind {
            MatchKind::Prefix => path.starts_with(&self.pattern),
            MatchKind::Exact => path == self.pattern,
        }
    }

    /// Replace the matched pattern at the start of `path` with `replacement`.
    ///
    /// Returns `None` when the path does not match. An empty result becomes "/".
    pub fn rewrite(&self, path: &str, replacement: &str) -> Option<String> {
        if !self.matches(path) {
            return None;
        }
        let rest = &path[self.pattern.len()..];

        let mut rewritten = String::with_capacity(replacement.len() + rest.len() + 1);
        rewritten.push_str(replacement);
        // "/api" -> "/v2" on "/api/users" keeps the separator from `rest`,
        // "/api/" -> "/v2" must not glue "v2" onto "users".
        if replacement.ends_with('/') && rest.starts_with('/') {
            rewritten.push_str(&rest[1..]);
        } else if !replacement.is_empty()
            && !replacement.ends_with('/')
            && !rest.is_empty()
            && !rest.starts_with('/')
            && self.pattern.ends_with('/')
        {
            rewritten.push('/');
            rewritten.push_str(rest);
        } else {
            rewritten.push_str(rest);
        }

        if !rewritten.starts_with('/') {
            rewritten.insert(0, '/');
        }
        Some(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_descendants() {
        let matcher = PathMatcher::prefix("/api/");
        assert!(matcher.matches("/api/"));
        assert!(matcher.matches("/api/users"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/apiary"));
        assert!(!matcher.matches("/API/users"));
    }

    #[test]
    fn exact_matches_only_itself() {
        let matcher = PathMatcher::exact("/about");
        assert!(matcher.matches("/about"));
        assert!(!matcher.matches("/about/"));
        assert!(!matcher.matches("/about/team"));
    }

    #[test]
    fn rewrite_strips_matched_prefix() {
        let matcher = PathMatcher::prefix("/api/");
        assert_eq!(matcher.rewrite("/api/users", "/").as_deref(), Some("/users"));
        assert_eq!(matcher.rewrite("/api/hello", "/").as_deref(), Some("/hello"));
        assert_eq!(matcher.rewrite("/api/", "/").as_deref(), Some("/"));
        assert_eq!(matcher.rewrite("/web/", "/"), None);
    }

    #[test]
    fn rewrite_substitutes_other_prefixes() {
        let matcher = PathMatcher::prefix("/api/");
        assert_eq!(matcher.rewrite("/api/users", "/v2/").as_deref(), Some("/v2/users"));
        assert_eq!(matcher.rewrite("/api/users", "/v2").as_deref(), Some("/v2/users"));
        assert_eq!(matcher.rewrite("/api/users", "").as_deref(), Some("/users"));

        let bare = PathMatcher::prefix("/api");
        assert_eq!(bare.rewrite("/api/users", "/v2").as_deref(), Some("/v2/users"));
        assert_eq!(bare.rewrite("/api", "").as_deref(), Some("/"));
    }
}

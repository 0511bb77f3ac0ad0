//! Upstream table management.
//!
//! # Responsibilities
//! - Build named upstreams from configuration
//! - Look up an upstream by name during dispatch
//! - List upstreams for the admin API

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ConfigError, PoolConfig, UpstreamConfig};
use crate::upstream::backend::Upstream;

/// Immutable name → upstream map.
#[derive(Debug, Clone, Default)]
pub struct UpstreamTable {
    upstreams: BTreeMap<String, Arc<Upstream>>,
}

impl UpstreamTable {
    /// Create the upstream table from configuration.
    pub fn new(configs: &[UpstreamConfig], pool: &PoolConfig) -> Result<Self, ConfigError> {
        let mut upstreams = BTreeMap::new();
        for config in configs {
            let upstream = Upstream::new(config, pool.max_connections_per_upstream)?;
            tracing::debug!(
                upstream = %config.name,
                authority = %upstream.authority(),
                capacity = pool.max_connections_per_upstream,
                "Upstream registered"
            );
            upstreams.insert(config.name.clone(), Arc::new(upstream));
        }
        Ok(Self { upstreams })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Upstream>> {
        self.upstreams.get(name)
    }

    /// All upstreams, ordered by name.
    pub fn all(&self) -> impl Iterator<Item = &Arc<Upstream>> {
        self.upstreams.values()
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}

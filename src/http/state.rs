//! Shared request-handling state.
//!
//! A [`RoutingState`] is everything compiled from one configuration. Handlers
//! load the current one once per request; reloads build a new state and swap
//! the pointer, so a request never sees a half-applied configuration.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::config::{ConfigError, GatewayConfig};
use crate::http::dispatch::Dispatcher;
use crate::net::ConnectionTracker;
use crate::observability::metrics;
use crate::routing::RouteTable;
use crate::static_files::StaticFiles;
use crate::upstream::UpstreamTable;

/// Immutable routing data for one configuration generation.
#[derive(Debug)]
pub struct RoutingState {
    pub routes: RouteTable,
    pub upstreams: UpstreamTable,
    pub dispatcher: Dispatcher,
    pub static_files: Option<StaticFiles>,
    pub generation: u64,
}

impl RoutingState {
    pub fn from_config(config: &GatewayConfig, generation: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            routes: RouteTable::load(&config.routes)?,
            upstreams: UpstreamTable::new(&config.upstreams, &config.pool)?,
            dispatcher: Dispatcher::new(&config.timeouts, &config.pool),
            static_files: StaticFiles::from_config(&config.static_files),
            generation,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routing: Arc<ArcSwap<RoutingState>>,
    pub connections: ConnectionTracker,
    /// Serialises reloads so each one publishes a distinct generation.
    reload_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let routing = RoutingState::from_config(config, 1)?;
        Ok(Self {
            routing: Arc::new(ArcSwap::from_pointee(routing)),
            connections: ConnectionTracker::new(),
            reload_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Current routing state.
    pub fn routing(&self) -> Arc<RoutingState> {
        self.routing.load_full()
    }

    /// Build a new routing state from `config` and swap it in.
    /// On error the running state is left untouched.
    pub fn reload(&self, config: &GatewayConfig) -> Result<u64, ConfigError> {
        // The guarded data is `()`, so a poisoned lock is still usable.
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.routing.load().generation + 1;
        let next = match RoutingState::from_config(config, generation) {
            Ok(next) => next,
            Err(e) => {
                metrics::record_config_reload(false);
                return Err(e);
            }
        };

        tracing::info!(
            generation,
            routes = next.routes.len(),
            upstreams = next.upstreams.len(),
            "Routing configuration applied"
        );
        self.routing.store(Arc::new(next));
        metrics::record_config_reload(true);
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RouteConfig, UpstreamConfig};

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstreams.push(UpstreamConfig::new("backend", "127.0.0.1", 5000));
        config.routes.push(RouteConfig::prefix("/api/", "backend"));
        config
    }

    #[test]
    fn reload_swaps_whole_state() {
        let state = AppState::new(&config()).unwrap();
        let before = state.routing();
        assert_eq!(before.generation, 1);

        let mut next = config();
        next.routes.push(RouteConfig::static_root("/"));
        assert_eq!(state.reload(&next).unwrap(), 2);

        let after = state.routing();
        assert_eq!(after.routes.len(), 2);
        // Readers holding the old state keep a consistent view.
        assert_eq!(before.routes.len(), 1);
    }

    #[test]
    fn failed_reload_keeps_current_state() {
        let state = AppState::new(&config()).unwrap();

        let mut broken = config();
        broken.routes.push(RouteConfig::prefix("/api/", "backend"));
        assert!(state.reload(&broken).is_err());

        let current = state.routing();
        assert_eq!(current.generation, 1);
        assert_eq!(current.routes.len(), 1);
    }

    #[test]
    fn concurrent_reloads_publish_distinct_generations() {
        let state = AppState::new(&config()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.reload(&config()).unwrap())
            })
            .collect();
        let mut generations: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        generations.sort_unstable();

        assert_eq!(generations, (2..=9).collect::<Vec<_>>());
        assert_eq!(state.routing().generation, 9);
    }
}

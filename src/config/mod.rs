//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into RoutingState, shared via ArcSwap
//!
//! On reload (file change, SIGHUP, admin API):
//!     loader.rs loads new config
//!     → validation.rs validates
//!     → new RoutingState built
//!     → atomic swap; in-flight requests keep the old state
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_effective_config, parse_config, ConfigError, Overrides};
pub use schema::{
    AdminConfig, GatewayConfig, ListenerConfig, LogFormat, MatchKind, ObservabilityConfig,
    PoolConfig, RouteConfig, StaticFilesConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;

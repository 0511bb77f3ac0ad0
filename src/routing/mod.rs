//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup over pre-sorted entries)
//!     → matcher.rs (prefix / exact comparison, rewrite)
//!     → Return: matched Route or NotFound
//!
//! Route Compilation (at startup and on reload):
//!     RouteConfig[]
//!     → Reject identical patterns
//!     → Sort by pattern length (longest first, stable)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - NotFound is not an error: the caller falls back to static assets

pub mod matcher;
pub mod router;

pub use matcher::PathMatcher;
pub use router::{Route, RouteMatch, RouteTable, RouteTarget};

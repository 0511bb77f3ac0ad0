//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → upstream name identified
//!     → pool.rs (look up the named upstream)
//!     → backend.rs (wait for a request slot, build target URI)
//!     → dispatcher forwards over the shared hyper client
//! ```
//!
//! # Design Decisions
//! - One address per upstream; no replica selection
//! - Slot acquisition waits on the requesting task only
//! - Keep-alive connections are pooled by the hyper client, per authority

pub mod backend;
pub mod pool;

pub use backend::{Upstream, UpstreamPermit};
pub use pool::UpstreamTable;

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → routing::RouteTable (longest prefix wins)
//!     → dispatch.rs (headers.rs, upstream slot, forward)
//!       or static_files (asset, SPA index fallback)
//!     → response.rs (gateway errors to status codes)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;
pub mod state;

pub use dispatch::{DispatchError, Dispatcher};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
pub use state::{AppState, RoutingState};

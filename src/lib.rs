//! Reverse proxy and static file gateway for single-page applications.
//!
//! Requests are matched against a route table (longest prefix wins). Matches
//! with an upstream are forwarded over HTTP/1.1; everything else is served
//! from the static root, with unknown paths falling back to the index page so
//! client-side routing works.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod static_files;
pub mod upstream;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

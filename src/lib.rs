//! Static content HTTP server with a middleware chain.
//!
//! Requests pass through access logging, conditional gzip compression and
//! virtual host filtering before reaching the file server. With TLS enabled
//! a second, plain listener redirects everything to HTTPS.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ServerConfig;
pub use http::{Handler, HttpServer};
pub use lifecycle::Shutdown;

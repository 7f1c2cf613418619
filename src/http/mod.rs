//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum/hyper, one task per connection)
//!     → request.rs (IncomingRequest from the request head + peer address)
//!     → middleware (handler chain writes into a ResponseSink)
//!     → response.rs (StreamingSink hands head and body frames to hyper)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{Handler, HandlerError};
pub use request::IncomingRequest;
pub use response::{ResponseBuffer, ResponseSink, StreamingSink};
pub use server::{HttpServer, ServerError};

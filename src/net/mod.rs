//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (parse, bind)
//!     → tls.rs (certificate/key for the HTTPS listener)
//!     → Hand off to the HTTP layer
//! ```

pub mod listener;
pub mod tls;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server internals:
//!     → logging.rs (tracing events: startup, listener and handler failures)
//!
//! Completed requests:
//!     → access_log.rs (one line per request, file or stdout)
//! ```
//!
//! # Design Decisions
//! - Access log is a plain append-only text file, independent of tracing
//! - The log destination is chosen once at startup

pub mod access_log;
pub mod logging;

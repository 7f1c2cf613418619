//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (already validated) → HttpServer → listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → watch channel → listeners stop accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A listener that dies ends the process, it is not restarted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;

//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse configured listen addresses (including the `:port` shorthand)
//! - Bind, reporting failures with the address that failed
//!
//! # Design Decisions
//! - No connection cap: every accepted connection is served
//! - Bind errors are fatal to the listener, never retried

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::config::schema::parse_listen_addr;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The configured address does not parse.
    Address(String, std::net::AddrParseError),
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(addr, e) => write!(f, "Invalid listen address '{}': {}", addr, e),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Address(_, e) => Some(e),
            ListenerError::Bind(_, e) => Some(e),
        }
    }
}

/// Parse a configured listen address.
pub fn parse_addr(addr: &str) -> Result<SocketAddr, ListenerError> {
    parse_listen_addr(addr).map_err(|e| ListenerError::Address(addr.to_string(), e))
}

/// Bind a TCP listener on the configured address.
pub async fn bind(addr: &str) -> Result<TcpListener, ListenerError> {
    let addr = parse_addr(addr)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ListenerError::Bind(addr, e))?;

    let local_addr = listener.local_addr().map_err(|e| ListenerError::Bind(addr, e))?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files. The
//! capitalised aliases let the legacy `config.json` layout load unchanged.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener, content and access log settings.
    #[serde(alias = "Httpd")]
    pub httpd: HttpdConfig,

    /// Diagnostic logging settings.
    pub observability: ObservabilityConfig,
}

/// Settings for the static content server and its middleware chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpdConfig {
    /// Plain HTTP listen address (e.g., "0.0.0.0:80").
    #[serde(alias = "Http")]
    pub http: String,

    /// HTTPS listen address, used only when TLS is enabled.
    #[serde(alias = "Https")]
    pub https: String,

    /// TLS material for the HTTPS listener.
    #[serde(alias = "Ssl")]
    pub tls: TlsConfig,

    /// Substring the Host header must contain for content to be served.
    #[serde(alias = "Hostname")]
    pub hostname: String,

    /// Document root directory.
    #[serde(alias = "Root")]
    pub root: PathBuf,

    /// Access log file. Falls back to stdout when it cannot be opened.
    #[serde(alias = "AccessLog")]
    pub access_log: PathBuf,

    /// File extensions eligible for gzip compression, without leading dot.
    #[serde(alias = "Gzip")]
    pub gzip: Vec<String>,
}

impl HttpdConfig {
    /// Parsed plain HTTP listen address.
    pub fn http_addr(&self) -> Result<SocketAddr, AddrParseError> {
        parse_listen_addr(&self.http)
    }

    /// Parsed HTTPS listen address.
    pub fn https_addr(&self) -> Result<SocketAddr, AddrParseError> {
        parse_listen_addr(&self.https)
    }

    /// Port of the HTTPS listener, if the address parses.
    pub fn https_port(&self) -> Option<u16> {
        self.https_addr().ok().map(|addr| addr.port())
    }
}

/// Parses a listen address, accepting the host-less `:port` shorthand as
/// all IPv4 interfaces.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, AddrParseError> {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr).parse()
    } else {
        addr.parse()
    }
}

impl Default for HttpdConfig {
    fn default() -> Self {
        Self {
            http: "0.0.0.0:8080".to_string(),
            https: "0.0.0.0:8443".to_string(),
            tls: TlsConfig::default(),
            hostname: String::new(),
            root: PathBuf::from("."),
            access_log: PathBuf::from("access.log"),
            gzip: vec![
                "html".to_string(),
                "css".to_string(),
                "js".to_string(),
                "svg".to_string(),
                "txt".to_string(),
            ],
        }
    }
}

/// TLS configuration for the HTTPS listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Serve HTTPS and redirect plain HTTP to it.
    #[serde(alias = "Enabled")]
    pub enabled: bool,

    /// Path to certificate file (PEM).
    #[serde(alias = "Cert")]
    pub cert: PathBuf,

    /// Path to private key file (PEM).
    #[serde(alias = "Key")]
    pub key: PathBuf,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

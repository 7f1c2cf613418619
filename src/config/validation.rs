//! Configuration validation.
//!
//! Serde handles the syntax; this module checks the values make sense before
//! the server starts. Every problem is reported, not just the first.

use std::fmt;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `httpd.tls.cert`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let httpd = &config.httpd;
    let mut errors = Vec::new();

    if let Err(e) = httpd.http_addr() {
        errors.push(ValidationError::new(
            "httpd.http",
            format!("invalid listen address '{}': {}", httpd.http, e),
        ));
    }

    if httpd.tls.enabled {
        if let Err(e) = httpd.https_addr() {
            errors.push(ValidationError::new(
                "httpd.https",
                format!("invalid listen address '{}': {}", httpd.https, e),
            ));
        }
        if httpd.tls.cert.as_os_str().is_empty() {
            errors.push(ValidationError::new("httpd.tls.cert", "required when TLS is enabled"));
        }
        if httpd.tls.key.as_os_str().is_empty() {
            errors.push(ValidationError::new("httpd.tls.key", "required when TLS is enabled"));
        }
    }

    if !httpd.root.is_dir() {
        errors.push(ValidationError::new(
            "httpd.root",
            format!("'{}' is not a directory", httpd.root.display()),
        ));
    }

    for ext in &httpd.gzip {
        if ext.trim_start_matches('.').is_empty() {
            errors.push(ValidationError::new("httpd.gzip", "empty file extension"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

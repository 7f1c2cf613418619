//! Request/response interception chain.
//!
//! # Data Flow
//! ```text
//! content listener:   AccessLog → Gzip → HostFilter → FileServer
//! redirect listener:  AccessLog → Redirect
//! ```
//!
//! Every stage is a variant of [`Handler`] with the same single operation:
//! handle a request against a [`ResponseSink`], usually by delegating to the
//! next stage, possibly through a decorated sink. Chains are built by
//! nesting variants.
//!
//! # Design Decisions
//! - Closed set of variants dispatched by `match`, no trait objects
//! - The log line is written from a `Drop` guard, so it runs on every exit
//!   path; the compressor trailer is flushed once the inner chain returns,
//!   whatever it returned
//! - Configuration is copied into each stage at construction

pub mod access_log;
pub mod compress;
pub mod files;
pub mod gzip;
pub mod host_filter;
pub mod recorder;
pub mod redirect;

use std::io;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::config::HttpdConfig;
use crate::http::request::IncomingRequest;
use crate::http::response::ResponseSink;
use crate::observability::access_log::AccessLogSink;

pub use access_log::AccessLog;
pub use compress::CompressingWriter;
pub use files::FileServer;
pub use gzip::Gzip;
pub use host_filter::HostFilter;
pub use recorder::ResponseRecorder;
pub use redirect::Redirect;

/// Failure while producing a response.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("response write failed: {0}")]
    Io(#[from] io::Error),
}

/// One stage of the chain.
pub enum Handler {
    AccessLog(AccessLog),
    Gzip(Gzip),
    HostFilter(HostFilter),
    Redirect(Redirect),
    Files(FileServer),
    #[cfg(test)]
    Fixed(test_util::Fixed),
}

impl Handler {
    /// The content chain: access log, gzip, host filter, files.
    pub fn content(config: &HttpdConfig, log: Arc<AccessLogSink>) -> Result<Self, regex::Error> {
        let files = Handler::Files(FileServer::new(&config.root));
        let filtered = Handler::HostFilter(HostFilter::new(config.hostname.clone(), files));
        let compressed = Handler::Gzip(Gzip::new(&config.gzip, filtered)?);
        Ok(Handler::AccessLog(AccessLog::new(log, compressed)))
    }

    /// The chain for the plain listener when TLS is on: access log, redirect.
    pub fn redirect(config: &HttpdConfig, log: Arc<AccessLogSink>) -> Self {
        let redirect = Handler::Redirect(Redirect::new(config.https_port(), config.hostname.clone()));
        Handler::AccessLog(AccessLog::new(log, redirect))
    }

    pub fn handle<'a>(
        &'a self,
        request: &'a IncomingRequest,
        sink: &'a mut dyn ResponseSink,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        match self {
            Handler::AccessLog(h) => h.handle(request, sink).boxed(),
            Handler::Gzip(h) => h.handle(request, sink).boxed(),
            Handler::HostFilter(h) => h.handle(request, sink).boxed(),
            Handler::Redirect(h) => h.handle(request, sink).boxed(),
            Handler::Files(h) => h.handle(request, sink).boxed(),
            #[cfg(test)]
            Handler::Fixed(h) => h.handle(sink).boxed(),
        }
    }
}

//! Virtual host filtering.

use super::{Handler, HandlerError};
use crate::http::request::IncomingRequest;
use crate::http::response::{not_found, ResponseSink};

/// Serves only requests whose host contains the configured name.
///
/// This is a case-sensitive substring test, so `example.org` also admits
/// `www.example.org` and `example.org.evil`. It selects content, it does
/// not guard it.
pub struct HostFilter {
    hostname: String,
    inner: Box<Handler>,
}

impl HostFilter {
    pub fn new(hostname: impl Into<String>, inner: Handler) -> Self {
        Self {
            hostname: hostname.into(),
            inner: Box::new(inner),
        }
    }

    pub fn admits(&self, request: &IncomingRequest) -> bool {
        request.host().unwrap_or("").contains(self.hostname.as_str())
    }

    pub async fn handle(
        &self,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), HandlerError> {
        if self.admits(request) {
            self.inner.handle(request, sink).await
        } else {
            tracing::debug!(host = ?request.host(), "host not served");
            not_found(sink).await?;
            Ok(())
        }
    }
}

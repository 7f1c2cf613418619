//! Access logging around the whole chain.

use std::sync::Arc;

use chrono::Local;

use super::recorder::ResponseRecorder;
use super::{Handler, HandlerError};
use crate::http::request::IncomingRequest;
use crate::http::response::ResponseSink;
use crate::observability::access_log::{normalize_remote_addr, AccessLogEntry, AccessLogSink};

/// Records what the inner chain sends and appends one access log line per
/// request, however the inner chain finishes.
pub struct AccessLog {
    log: Arc<AccessLogSink>,
    inner: Box<Handler>,
}

impl AccessLog {
    pub fn new(log: Arc<AccessLogSink>, inner: Handler) -> Self {
        Self {
            log,
            inner: Box::new(inner),
        }
    }

    pub async fn handle(
        &self,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), HandlerError> {
        let mut pending = PendingEntry {
            log: &self.log,
            request,
            recorder: ResponseRecorder::new(sink),
            completed: false,
        };
        let result = self.inner.handle(request, &mut pending.recorder).await;
        pending.completed = true;
        result
    }
}

/// Writes the log line when dropped: after a normal return, an error, a
/// panic unwinding through the chain, or the request future being dropped.
struct PendingEntry<'a> {
    log: &'a AccessLogSink,
    request: &'a IncomingRequest,
    recorder: ResponseRecorder<'a>,
    completed: bool,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        // An untouched response still goes out as 200 once the chain returns.
        let status = match self.recorder.status() {
            Some(status) => status.as_u16(),
            None if self.completed => 200,
            None => 0,
        };
        let request = self.request;
        let entry = AccessLogEntry {
            remote_host: normalize_remote_addr(request.remote_addr()),
            timestamp: Local::now().fixed_offset(),
            method: request.method().as_str(),
            uri: request.request_uri(),
            status,
            bytes: self.recorder.bytes_written(),
            referer: request.referer().unwrap_or_default(),
            user_agent: request.user_agent().unwrap_or_default(),
        };
        self.log.append(&entry);
    }
}

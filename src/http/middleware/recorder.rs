//! Sink decorator recording status and delivered byte count.

use std::io;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};

use crate::http::response::ResponseSink;

/// Passes everything through to the wrapped sink while remembering the
/// status and how many body bytes reached it.
pub struct ResponseRecorder<'a> {
    inner: &'a mut dyn ResponseSink,
    status: Option<StatusCode>,
    bytes_written: u64,
}

impl<'a> ResponseRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink) -> Self {
        Self {
            inner,
            status: None,
            bytes_written: 0,
        }
    }

    /// Last status passed through, or 200 once a body write happened
    /// without one. `None` while the response is untouched.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body bytes the wrapped sink accepted for delivery.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl ResponseSink for ResponseRecorder<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
        self.inner.write_status(status);
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<usize>> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        async move {
            let delivered = self.inner.write(data).await?;
            self.bytes_written += delivered as u64;
            Ok(delivered)
        }
        .boxed()
    }
}

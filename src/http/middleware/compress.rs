//! Sink decorator that gzips the body on its way through.

use std::io::{self, Write};
use std::mem;

use axum::http::{header, HeaderMap, StatusCode};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::future::{BoxFuture, FutureExt};

use crate::http::response::ResponseSink;

/// Runs body writes through a gzip encoder and forwards whatever compressed
/// output each write produces to the wrapped sink. Headers and status go
/// straight to the wrapped sink.
///
/// A `206 Partial Content` status switches the writer to passthrough and
/// withdraws `Content-Encoding`: a byte range is sent as the file has it.
///
/// The stream is complete only after [`finish`](Self::finish).
pub struct CompressingWriter<'a> {
    inner: &'a mut dyn ResponseSink,
    encoder: GzEncoder<Vec<u8>>,
    committed: bool,
    passthrough: bool,
    finished: bool,
}

impl<'a> CompressingWriter<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink) -> Self {
        Self {
            inner,
            encoder: GzEncoder::new(Vec::new(), Compression::default()),
            committed: false,
            passthrough: false,
            finished: false,
        }
    }

    /// Whether body bytes bypass the encoder.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Flush the remaining compressed data and the gzip trailer. Only the
    /// first call has an effect.
    pub async fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        if self.passthrough {
            return Ok(());
        }
        self.encoder.try_finish()?;
        self.forward().await
    }

    async fn forward(&mut self) -> io::Result<()> {
        let compressed = mem::take(self.encoder.get_mut());
        if !compressed.is_empty() {
            self.inner.write(Bytes::from(compressed)).await?;
        }
        Ok(())
    }

    fn commit(&mut self, status: Option<StatusCode>) {
        if self.committed {
            return;
        }
        self.committed = true;
        let headers = self.inner.headers_mut();
        if status == Some(StatusCode::PARTIAL_CONTENT) {
            headers.remove(header::CONTENT_ENCODING);
            self.passthrough = true;
        } else {
            // The uncompressed length no longer describes the body.
            headers.remove(header::CONTENT_LENGTH);
        }
    }
}

impl ResponseSink for CompressingWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.commit(Some(status));
        self.inner.write_status(status);
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<usize>> {
        async move {
            if self.finished {
                return Err(io::Error::other("write after gzip stream was finished"));
            }
            self.commit(None);
            if self.passthrough {
                return self.inner.write(data).await;
            }
            self.encoder.write_all(&data)?;
            self.forward().await?;
            Ok(data.len())
        }
        .boxed()
    }
}

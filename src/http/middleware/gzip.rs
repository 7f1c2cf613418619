//! Conditional gzip compression.

use axum::http::{header, HeaderValue};
use regex::Regex;

use super::compress::CompressingWriter;
use super::{Handler, HandlerError};
use crate::http::request::IncomingRequest;
use crate::http::response::ResponseSink;

/// Compresses responses for clients that accept gzip when the request path
/// ends in one of the configured extensions.
pub struct Gzip {
    pattern: Option<Regex>,
    inner: Box<Handler>,
}

impl Gzip {
    /// `extensions` are matched case-insensitively against the end of the
    /// path, with or without a leading dot. An empty list never compresses.
    pub fn new<S: AsRef<str>>(extensions: &[S], inner: Handler) -> Result<Self, regex::Error> {
        let pattern = if extensions.is_empty() {
            None
        } else {
            let alternation = extensions
                .iter()
                .map(|ext| regex::escape(ext.as_ref().trim_start_matches('.')))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\.(?:{})$", alternation))?)
        };
        Ok(Self {
            pattern,
            inner: Box::new(inner),
        })
    }

    /// Whether the response to `request` gets compressed.
    pub fn should_compress(&self, request: &IncomingRequest) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        let accepts_gzip = request
            .header(header::ACCEPT_ENCODING)
            .map_or(false, |value| value.contains("gzip"));
        if !accepts_gzip {
            return false;
        }
        pattern.is_match(effective_path(request.path()))
    }

    pub async fn handle(
        &self,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), HandlerError> {
        if !self.should_compress(request) {
            return self.inner.handle(request, sink).await;
        }

        sink.headers_mut()
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));

        let mut writer = CompressingWriter::new(sink);
        let result = self.inner.handle(request, &mut writer).await;
        let finished = writer.finish().await;
        result?;
        finished?;
        Ok(())
    }
}

/// The path used for extension matching: the root stands for its index page.
fn effective_path(path: &str) -> &str {
    if path == "/" {
        "/index.html"
    } else {
        path
    }
}

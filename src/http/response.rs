//! Response sinks.
//!
//! A [`ResponseSink`] is the request-scoped capability handlers write their
//! response into: headers first, then at most one status, then body bytes.
//! Middleware decorate a sink by wrapping it. On the wire the innermost sink
//! is a [`StreamingSink`], which hands the response head to the transport as
//! soon as the status is committed and forwards body frames as they are
//! written.
//!
//! # Design Decisions
//! - A status set twice keeps the first value, as the wire would
//! - Body bytes wait in a small bounded channel, so a slow client slows the
//!   handler down instead of growing memory
//! - Bytes a response cannot carry (HEAD, 1xx, 204, 304) are accepted and
//!   dropped, and reported as not delivered

use std::convert::Infallible;
use std::io;
use std::mem;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

/// Body frames buffered between the handler chain and the connection.
pub const FRAME_BUFFER: usize = 8;

/// The write side of one response.
pub trait ResponseSink: Send {
    /// Response headers. Changes made after the status is committed do not
    /// reach the client.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Commit the status code. Only the first call takes effect.
    fn write_status(&mut self, status: StatusCode);

    /// Write body bytes, committing status 200 first if none was set.
    ///
    /// The whole of `data` is consumed. Resolves to how many of those bytes
    /// will be delivered to the client, which is less when the response
    /// cannot carry them.
    fn write(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<usize>>;
}

fn carries_body(head: bool, status: StatusCode) -> bool {
    !(head
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// The innermost sink on a live connection.
///
/// Created together with the receiver the transport awaits for the response.
/// The head is sent when the status is committed; the body then streams
/// through a channel holding at most [`FRAME_BUFFER`] frames.
pub struct StreamingSink {
    status: Option<StatusCode>,
    headers: HeaderMap,
    head: bool,
    response: Option<oneshot::Sender<Response>>,
    frames: Option<mpsc::Sender<Bytes>>,
}

impl StreamingSink {
    /// A sink answering a request with the given method, and the receiver
    /// its response arrives on.
    pub fn new(method: &Method) -> (Self, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self {
            status: None,
            headers: HeaderMap::new(),
            head: *method == Method::HEAD,
            response: Some(tx),
            frames: None,
        };
        (sink, rx)
    }

    fn commit(&mut self, status: StatusCode) {
        self.status = Some(status);

        let body = if carries_body(self.head, status) {
            let (tx, rx) = mpsc::channel(FRAME_BUFFER);
            self.frames = Some(tx);
            Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
        } else {
            Body::empty()
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = mem::take(&mut self.headers);

        if let Some(tx) = self.response.take() {
            // Fails only when the connection is already gone.
            let _ = tx.send(response);
        }
    }

    /// End the response. A sink nobody wrote to answers an empty 200.
    pub fn finish(mut self) {
        if self.status.is_none() {
            self.commit(StatusCode::OK);
        }
    }
}

impl ResponseSink for StreamingSink {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(current) => {
                tracing::warn!(%current, ignored = %status, "superfluous status write");
            }
            None => self.commit(status),
        }
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<usize>> {
        if self.status.is_none() {
            self.commit(StatusCode::OK);
        }
        let frames = self.frames.as_ref();
        async move {
            let Some(frames) = frames else {
                return Ok(0);
            };
            if data.is_empty() {
                return Ok(0);
            }
            let len = data.len();
            frames.send(data).await.map_err(|_| {
                io::Error::new(io::ErrorKind::BrokenPipe, "client closed the response stream")
            })?;
            Ok(len)
        }
        .boxed()
    }
}

/// A sink collecting the whole response in memory.
#[derive(Debug)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    head: bool,
}

impl ResponseBuffer {
    /// A buffer for answering a request with the given method.
    pub fn new(method: &Method) -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            body: Vec::new(),
            head: *method == Method::HEAD,
        }
    }

    /// The committed status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Convert into a transport response. An untouched buffer becomes an
    /// empty 200.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for ResponseBuffer {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(current) => {
                tracing::warn!(%current, ignored = %status, "superfluous status write");
            }
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, io::Result<usize>> {
        let status = *self.status.get_or_insert(StatusCode::OK);
        let delivered = if carries_body(self.head, status) {
            self.body.extend_from_slice(&data);
            data.len()
        } else {
            0
        };
        future::ready(Ok(delivered)).boxed()
    }
}

/// Answer with the standard plain-text 404.
pub(crate) async fn not_found(sink: &mut dyn ResponseSink) -> io::Result<()> {
    plain_error(sink, StatusCode::NOT_FOUND, "404 page not found").await
}

/// Answer with a short plain-text error body.
pub(crate) async fn plain_error(
    sink: &mut dyn ResponseSink,
    status: StatusCode,
    message: &str,
) -> io::Result<()> {
    let headers = sink.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    sink.write_status(status);
    sink.write(Bytes::from(format!("{}\n", message))).await?;
    Ok(())
}

/// Escape text for inclusion in HTML.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;

    #[tokio::test]
    async fn first_write_commits_ok() {
        let mut buffer = ResponseBuffer::new(&Method::GET);
        assert_eq!(buffer.write(Bytes::from_static(b"hello")).await.unwrap(), 5);
        assert_eq!(buffer.status(), Some(StatusCode::OK));

        let response = buffer.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn second_status_is_ignored() {
        let mut buffer = ResponseBuffer::new(&Method::GET);
        buffer.write_status(StatusCode::NOT_FOUND);
        buffer.write_status(StatusCode::OK);
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn bodiless_responses_drop_bytes() {
        let mut buffer = ResponseBuffer::new(&Method::GET);
        buffer.write_status(StatusCode::NOT_MODIFIED);
        assert_eq!(buffer.write(Bytes::from_static(b"ignored")).await.unwrap(), 0);
        assert!(buffer.body().is_empty());

        let mut buffer = ResponseBuffer::new(&Method::HEAD);
        assert_eq!(buffer.write(Bytes::from_static(b"ignored")).await.unwrap(), 0);
        assert_eq!(buffer.status(), Some(StatusCode::OK));
        assert!(buffer.body().is_empty());
    }

    #[tokio::test]
    async fn not_found_body() {
        let mut buffer = ResponseBuffer::new(&Method::GET);
        not_found(&mut buffer).await.unwrap();
        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(buffer.body(), b"404 page not found\n");
        assert_eq!(
            buffer.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&#34;x&#34;&gt;&amp;&#39;");
    }

    #[tokio::test]
    async fn head_is_sent_before_the_body() {
        let (mut sink, response) = StreamingSink::new(&Method::GET);
        sink.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        sink.write_status(StatusCode::CREATED);

        let response = response.await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");

        assert_eq!(sink.write(Bytes::from_static(b"hello ")).await.unwrap(), 6);
        assert_eq!(sink.write(Bytes::from_static(b"world")).await.unwrap(), 5);
        sink.finish();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");
    }

    #[tokio::test]
    async fn untouched_sink_finishes_as_empty_ok() {
        let (sink, response) = StreamingSink::new(&Method::GET);
        sink.finish();

        let response = response.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn head_request_delivers_nothing() {
        let (mut sink, response) = StreamingSink::new(&Method::HEAD);
        assert_eq!(sink.write(Bytes::from_static(b"body")).await.unwrap(), 0);
        sink.finish();
        assert_eq!(response.await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn writes_fail_once_the_client_is_gone() {
        let (mut sink, response) = StreamingSink::new(&Method::GET);
        sink.write_status(StatusCode::OK);
        drop(response.await.unwrap());

        let err = sink.write(Bytes::from_static(b"late")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn unread_body_holds_the_writer_back() {
        let (mut sink, response) = StreamingSink::new(&Method::GET);
        sink.write_status(StatusCode::OK);
        let response = response.await.unwrap();

        for _ in 0..FRAME_BUFFER {
            sink.write(Bytes::from_static(b"frame")).await.unwrap();
        }
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            sink.write(Bytes::from_static(b"one too many")),
        )
        .await;
        assert!(blocked.is_err());
        drop(response);
    }
}

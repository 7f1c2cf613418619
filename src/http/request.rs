//! Request view handed to the middleware chain.
//!
//! # Design Decisions
//! - The body is not carried: the chain serves static content only
//! - Immutable once built; middleware derive values but never rewrite it
//! - Remote address kept as the transport formatted it (`host:port`,
//!   IPv6 bracketed) so access log normalization sees the raw form

use std::borrow::Cow;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, Method, Request, Uri, Version};

/// An incoming request as observed by the handlers.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: String,
}

impl IncomingRequest {
    /// Build from the request head and the peer address.
    pub fn new(parts: Parts, remote_addr: impl Into<String>) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            remote_addr: remote_addr.into(),
        }
    }

    /// Build from a complete request, discarding its body.
    pub fn from_request<B>(request: Request<B>, remote_addr: impl Into<String>) -> Self {
        let (parts, _) = request.into_parts();
        Self::new(parts, remote_addr)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The request target as received: path plus query.
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }

    /// The requested host: the Host header, else the URI authority
    /// (HTTP/2 carries it there).
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
    }

    /// First value of a header, lossily decoded.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    pub fn referer(&self) -> Option<Cow<'_, str>> {
        self.header(header::REFERER)
    }

    pub fn user_agent(&self) -> Option<Cow<'_, str>> {
        self.header(header::USER_AGENT)
    }

    /// A bodiless copy of the request for handing to a tower service.
    pub(crate) fn to_http(&self) -> Request<Body> {
        let mut request = Request::new(Body::empty());
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        request
    }
}

//! Plain HTTP to HTTPS redirection.

use axum::http::{header, HeaderValue, Method, StatusCode};
use bytes::Bytes;

use super::HandlerError;
use crate::http::request::IncomingRequest;
use crate::http::response::{escape_html, plain_error, ResponseSink};

/// `Strict-Transport-Security` value sent with every redirect (one week).
pub const HSTS: &str = "max-age=604800";

/// Answers every request with a permanent redirect to the same resource
/// over HTTPS. Terminal: there is nothing behind it, health checks included.
pub struct Redirect {
    https_port: Option<u16>,
    fallback_host: String,
}

impl Redirect {
    /// `https_port` is appended to the redirect target unless it is 443.
    /// `fallback_host` is used for requests that carry no host at all.
    pub fn new(https_port: Option<u16>, fallback_host: impl Into<String>) -> Self {
        Self {
            https_port,
            fallback_host: fallback_host.into(),
        }
    }

    /// The absolute HTTPS URL for `request`.
    pub fn location(&self, request: &IncomingRequest) -> String {
        let host = request
            .host()
            .map(strip_port)
            .filter(|host| !host.is_empty())
            .unwrap_or(self.fallback_host.as_str());
        match self.https_port {
            Some(port) if port != 443 => {
                format!("https://{}:{}{}", host, port, request.request_uri())
            }
            _ => format!("https://{}{}", host, request.request_uri()),
        }
    }

    pub async fn handle(
        &self,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), HandlerError> {
        let location = self.location(request);
        let Ok(value) = HeaderValue::from_str(&location) else {
            plain_error(sink, StatusCode::BAD_REQUEST, "400 bad request").await?;
            return Ok(());
        };

        let with_body = request.method() == Method::GET || request.method() == Method::HEAD;
        let headers = sink.headers_mut();
        headers.insert(header::LOCATION, value);
        headers.append(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS),
        );
        if with_body {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
        }
        sink.write_status(StatusCode::MOVED_PERMANENTLY);
        if with_body {
            let body = format!(
                "<a href=\"{}\">Moved Permanently</a>.\n",
                escape_html(&location)
            );
            sink.write(Bytes::from(body)).await?;
        }
        Ok(())
    }
}

/// Removes a trailing `:port` from a host, leaving IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

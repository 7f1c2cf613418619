//! Static file serving from the document root.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use super::HandlerError;
use crate::http::request::IncomingRequest;
use crate::http::response::{escape_html, not_found, plain_error, ResponseSink};

/// Characters escaped in directory listing links.
const LINK: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Terminal handler serving files below a root directory.
///
/// Files (and `index.html` for directories) come from `ServeDir`, which
/// handles content types, conditional and range requests. Its body frames
/// are written to the sink one at a time. Directories without an index page
/// get a plain listing.
pub struct FileServer {
    root: PathBuf,
    files: ServeDir,
}

impl FileServer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            files: ServeDir::new(&root).append_index_html_on_directories(true),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn handle(
        &self,
        request: &IncomingRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), HandlerError> {
        let response = self
            .files
            .clone()
            .oneshot(request.to_http())
            .await
            .unwrap_or_else(|never| match never {});

        if response.status() == StatusCode::NOT_FOUND {
            return match self.listable_dir(request.path()).await {
                Some(dir) => self.list(&dir, sink).await,
                None => Ok(not_found(sink).await?),
            };
        }

        let (parts, body) = response.into_parts();
        let headers = sink.headers_mut();
        for (name, value) in parts.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        sink.write_status(parts.status);

        let mut body = Body::new(body);
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(io::Error::other)?;
            if let Ok(data) = frame.into_data() {
                sink.write(data).await?;
            }
        }
        Ok(())
    }

    /// The directory a slash-terminated request path names, if it exists
    /// below the root.
    async fn listable_dir(&self, path: &str) -> Option<PathBuf> {
        if !path.ends_with('/') {
            return None;
        }
        let decoded = percent_decode_str(path).decode_utf8().ok()?;
        let mut dir = self.root.clone();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => return None,
                s if s.contains('\\') || s.contains('\0') => return None,
                s => dir.push(s),
            }
        }
        let metadata = tokio::fs::metadata(&dir).await.ok()?;
        metadata.is_dir().then_some(dir)
    }

    async fn list(&self, dir: &Path, sink: &mut dyn ResponseSink) -> Result<(), HandlerError> {
        let names = match read_names(dir).await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "Reading directory failed");
                plain_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Error reading directory")
                    .await?;
                return Ok(());
            }
        };

        let mut html = String::from("<pre>\n");
        for name in &names {
            let href = utf8_percent_encode(name, LINK).to_string();
            html.push_str(&format!(
                "<a href=\"{}\">{}</a>\n",
                escape_html(&href),
                escape_html(name)
            ));
        }
        html.push_str("</pre>\n");

        sink.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        sink.write_status(StatusCode::OK);
        sink.write(Bytes::from(html)).await?;
        Ok(())
    }
}

/// Sorted entry names of `dir`, directories suffixed with `/`.
async fn read_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

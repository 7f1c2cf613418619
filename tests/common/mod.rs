//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use httpd_chain::config::HttpdConfig;
use httpd_chain::http::server::serve;
use httpd_chain::http::{Handler, HttpServer};
use httpd_chain::Shutdown;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const INDEX: &str = "<!doctype html><h1>Welcome</h1>";
pub const STYLE: &str = "body { margin: 0; padding: 0; } h1 { font-size: 2em; }";
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

/// A document root with an index page, a stylesheet, an image and an
/// index-less directory.
pub fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
    std::fs::write(dir.path().join("style.css"), STYLE).unwrap();
    std::fs::write(dir.path().join("logo.png"), PNG).unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();
    std::fs::write(dir.path().join("docs").join("readme.txt"), "read me").unwrap();
    dir
}

/// A server running one chain on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub log_path: PathBuf,
    pub shutdown: Shutdown,
    _log_dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn log_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Access log lines once at least `count` have been written. Lines are
    /// written after the response is on its way, so poll briefly.
    pub async fn wait_for_lines(&self, count: usize) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let lines = self.log_lines();
            if lines.len() >= count || tokio::time::Instant::now() >= deadline {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub fn config(root: &Path, hostname: &str, gzip: &[&str], log_path: &Path) -> HttpdConfig {
    HttpdConfig {
        root: root.to_path_buf(),
        hostname: hostname.to_string(),
        gzip: gzip.iter().map(|s| s.to_string()).collect(),
        access_log: log_path.to_path_buf(),
        ..HttpdConfig::default()
    }
}

async fn start(chain: impl FnOnce(&HttpServer) -> Handler, config: HttpdConfig, log_dir: TempDir) -> TestServer {
    let log_path = config.access_log.clone();
    let server = HttpServer::new(config).unwrap();
    let chain = chain(&server);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    tokio::spawn(serve(listener, chain, shutdown.subscribe()));

    TestServer {
        addr,
        log_path,
        shutdown,
        _log_dir: log_dir,
    }
}

/// Serve the content chain for `root`.
pub async fn start_content(root: &Path, hostname: &str, gzip: &[&str]) -> TestServer {
    let log_dir = tempfile::tempdir().unwrap();
    let config = config(root, hostname, gzip, &log_dir.path().join("access.log"));
    start(|server| server.content_chain().unwrap(), config, log_dir).await
}

/// Serve the redirect chain with the given HTTPS listen address.
pub async fn start_redirect(https: &str, hostname: &str) -> TestServer {
    let log_dir = tempfile::tempdir().unwrap();
    let mut config = config(log_dir.path(), hostname, &[], &log_dir.path().join("access.log"));
    config.https = https.to_string();
    config.tls.enabled = true;
    start(HttpServer::redirect_chain, config, log_dir).await
}

/// Certificate and key checked in for TLS tests (self-signed, `localhost`).
pub fn tls_fixtures() -> (PathBuf, PathBuf) {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");
    (dir.join("cert.pem"), dir.join("key.pem"))
}

/// A client that neither follows redirects nor decompresses.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

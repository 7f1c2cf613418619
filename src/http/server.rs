//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the handler chains from configuration
//! - Run the chain for each request in its own task, streaming what it
//!   writes back through the connection
//! - Run the content listener, or with TLS the HTTPS listener plus the
//!   plain redirect listener
//! - Surface the failure of either listener as fatal

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::config::HttpdConfig;
use crate::http::middleware::Handler;
use crate::http::request::IncomingRequest;
use crate::http::response::StreamingSink;
use crate::lifecycle::shutdown;
use crate::net::listener::{self, ListenerError};
use crate::net::tls::{self, TlsError};
use crate::observability::access_log::AccessLogSink;

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Fatal server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("cannot start access log writer: {0}")]
    AccessLog(#[source] io::Error),
    #[error("invalid gzip extension pattern: {0}")]
    Pipeline(#[from] regex::Error),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error("{role} listener failed: {source}")]
    Serve {
        role: &'static str,
        #[source]
        source: io::Error,
    },
}

/// The static content server.
pub struct HttpServer {
    config: HttpdConfig,
    log: Arc<AccessLogSink>,
}

impl HttpServer {
    /// Create a server, opening the access log once for its lifetime.
    pub fn new(config: HttpdConfig) -> Result<Self, ServerError> {
        let log = AccessLogSink::open(&config.access_log).map_err(ServerError::AccessLog)?;
        Ok(Self::with_access_log(config, Arc::new(log)))
    }

    pub fn with_access_log(config: HttpdConfig, log: Arc<AccessLogSink>) -> Self {
        Self { config, log }
    }

    /// The chain serving content.
    pub fn content_chain(&self) -> Result<Handler, ServerError> {
        Ok(Handler::content(&self.config, Arc::clone(&self.log))?)
    }

    /// The chain answering the plain listener when TLS is on.
    pub fn redirect_chain(&self) -> Handler {
        Handler::redirect(&self.config, Arc::clone(&self.log))
    }

    pub fn config(&self) -> &HttpdConfig {
        &self.config
    }

    /// Run until `shutdown` fires or a listener fails.
    pub async fn run(self, shutdown: &shutdown::Shutdown) -> Result<(), ServerError> {
        let content = self.content_chain()?;
        tracing::info!(
            root = %self.config.root.display(),
            hostname = %self.config.hostname,
            access_log = %self.log.destination(),
            tls = self.config.tls.enabled,
            "Starting HTTP server"
        );

        if !self.config.tls.enabled {
            let plain = listener::bind(&self.config.http).await?;
            return serve(plain, content, shutdown.subscribe())
                .await
                .map_err(|source| listener_failed("http", source));
        }

        let https_addr = listener::parse_addr(&self.config.https)?;
        let tls_config = tls::load_tls_config(&self.config.tls.cert, &self.config.tls.key).await?;

        let redirect = async {
            let plain = listener::bind(&self.config.http)
                .await
                .map_err(|err| listener_failed("http", io::Error::other(err)))?;
            serve(plain, self.redirect_chain(), shutdown.subscribe())
                .await
                .map_err(|source| listener_failed("http", source))
        };
        let secure = async {
            serve_tls(https_addr, tls_config, content, shutdown.subscribe())
                .await
                .map_err(|source| listener_failed("https", source))
        };
        tokio::try_join!(redirect, secure)?;
        Ok(())
    }
}

fn listener_failed(role: &'static str, source: io::Error) -> ServerError {
    tracing::error!(role, error = %source, "Listener failed");
    ServerError::Serve { role, source }
}

/// The axum application running `chain` for every request.
pub fn app(chain: Handler) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(Arc::new(chain))
        .layer(TraceLayer::new_for_http())
}

/// Serve `chain` on an already bound listener until shutdown.
pub async fn serve(
    listener: TcpListener,
    chain: Handler,
    shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Listening for HTTP connections");

    axum::serve(
        listener,
        app(chain).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::wait(shutdown))
    .await?;

    tracing::info!(address = %addr, "HTTP listener stopped");
    Ok(())
}

/// Serve `chain` over TLS on `addr` until shutdown.
pub async fn serve_tls(
    addr: SocketAddr,
    tls_config: RustlsConfig,
    chain: Handler,
    shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let handle = axum_server::Handle::new();
    let watcher = handle.clone();
    tokio::spawn(async move {
        shutdown::wait(shutdown).await;
        watcher.graceful_shutdown(Some(TLS_DRAIN));
    });

    tracing::info!(address = %addr, "Listening for HTTPS connections");
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app(chain).into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    tracing::info!(address = %addr, "HTTPS listener stopped");
    Ok(())
}

/// Runs one request through the chain.
///
/// The chain runs in its own task and the response is returned as soon as
/// the chain commits a status; the body follows while the chain writes it.
async fn dispatch(
    State(chain): State<Arc<Handler>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let request = IncomingRequest::from_request(request, peer.to_string());
    let (mut sink, response) = StreamingSink::new(request.method());

    tokio::spawn(async move {
        if let Err(err) = chain.handle(&request, &mut sink).await {
            tracing::warn!(
                peer = %peer,
                path = %request.path(),
                error = %err,
                "Request handling failed"
            );
        }
        sink.finish();
    });

    match response.await {
        Ok(response) => response,
        Err(_) => {
            tracing::error!(peer = %peer, "Request handler aborted before responding");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

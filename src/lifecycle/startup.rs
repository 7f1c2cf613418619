//! Startup orchestration.
//!
//! Configuration is loaded and logging initialised by the binary; from
//! there this module builds the server, wires signals to shutdown and runs
//! until either a signal arrives or a listener fails.

use crate::config::ServerConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};

/// Run the server for a validated configuration.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.httpd)?;

    let serving = server.run(&shutdown);
    tokio::pin!(serving);

    tokio::select! {
        res = &mut serving => return res,
        res = signals::shutdown_signal() => {
            if let Err(err) = res {
                tracing::error!(error = %err, "Cannot listen for shutdown signals");
                return serving.await;
            }
        }
    }

    shutdown.trigger();
    serving.await
}

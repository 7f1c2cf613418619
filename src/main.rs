//! Static content HTTP server.
//!
//! ```text
//!   Client ──▶ AccessLog ──▶ Gzip ──▶ HostFilter ──▶ FileServer ──▶ document root
//!
//!   with TLS enabled, the plain listener instead runs:
//!   Client ──▶ AccessLog ──▶ Redirect (301 to https://…, HSTS)
//! ```

use std::path::PathBuf;

use clap::Parser;

use httpd_chain::config::load_config;
use httpd_chain::lifecycle::startup;
use httpd_chain::observability::logging;

#[derive(Parser)]
#[command(name = "httpd")]
#[command(about = "Static content server with gzip, virtual host filtering and access logging", long_about = None)]
struct Cli {
    /// Configuration file (TOML, or JSON when it ends in .json).
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .map_err(|e| format!("{}: {}", cli.config.display(), e))?;

    logging::init(&config.observability)?;

    if cli.check {
        tracing::info!(path = %cli.config.display(), "Configuration is valid");
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "httpd starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

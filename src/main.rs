//! scmdhttpd: a minimal HTTPS front door.
//!
//! This is the application entry point. It initializes tracing, loads the optional
//! TOML configuration and the vhost allowlist, builds the Axum router and starts
//! the plaintext and TLS listeners.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scmdhttpd::config::{GatewayConfig, DEFAULT_LOG_FILTER};
use scmdhttpd::http::start_server;
use scmdhttpd::routes::create_router;
use scmdhttpd::state::GatewayState;
use scmdhttpd::vhosts::VhostTable;
use scmdhttpd::StartupError;

/// scmdhttpd: static pages over HTTPS with automatic certificates
#[derive(Parser, Debug)]
#[command(name = "scmdhttpd", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "scmdhttpd=debug,access=info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Directory where vhosts.conf, index.html, robots.txt and favicon.ico are found
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory in which to store certificates
    #[arg(long)]
    certificate_dir: Option<PathBuf>,

    /// Custom ACME directory URL. It doesn't make sense to use this with --staging.
    #[arg(long)]
    acme_endpoint: Option<String>,

    /// Use the Let's Encrypt staging environment instead of production
    #[arg(long)]
    staging: bool,
}

impl Args {
    /// Load the configuration file (if any) and apply command line overrides.
    fn into_config(self) -> Result<GatewayConfig, StartupError> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(data_dir) = self.data_dir {
            config.content.data_dir = data_dir;
        }
        if let Some(certificate_dir) = self.certificate_dir {
            config.acme.certificate_dir = certificate_dir;
        }
        if let Some(endpoint) = self.acme_endpoint {
            config.acme.endpoint = Some(endpoint);
        }
        if self.staging {
            config.acme.staging = true;
        }

        Ok(config)
    }
}

fn init_tracing(log_filter: &str, json: bool) {
    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(log_filter));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let config = args.into_config()?;
    init_tracing(&log_filter, config.logging.is_json());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting scmdhttpd");

    // One process-wide crypto provider, even if several are compiled in
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let vhosts = VhostTable::load(config.content.vhosts_path()).map_err(StartupError::from)?;
    for entry in vhosts.entries() {
        match &entry.redirect_target {
            Some(target) => {
                tracing::info!(host = %entry.hostname, target = %target, "Vhost redirects")
            }
            None => tracing::info!(host = %entry.hostname, "Vhost served"),
        }
    }

    let state = GatewayState::new(vhosts, &config);
    let policy = state.host_policy();
    let app = create_router(state);

    start_server(app, &config, policy)
        .await
        .map_err(StartupError::from)?;

    Ok(())
}

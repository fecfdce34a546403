//! Listener startup.
//!
//! Runs the plaintext and TLS listeners side by side with the same router. The TLS
//! listener gets its certificates from the ACME state, restricted to the hosts the
//! policy allows; the ACME event loop runs on its own task.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum_server::Handle;
use futures::StreamExt;
use rustls_acme::caches::DirCache;
use rustls_acme::AcmeConfig;

use crate::config::{AcmeSettings, GatewayConfig};
use crate::policy::HostPolicy;

use super::shutdown;
use super::tls::{self, GatewayAcceptor, PolicyResolver};

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address '{0}'")]
    Address(String),

    #[error("Failed to create ACME cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

fn listen_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, port))
        .map_err(|_| ServerError::Address(host.to_string()))
}

/// Start both listeners.
///
/// This function blocks until the server shuts down or a listener fails.
pub async fn start_server(
    app: Router,
    config: &GatewayConfig,
    policy: HostPolicy,
) -> Result<(), ServerError> {
    let http_addr = listen_addr(&config.http.host, config.http.http_port)?;
    let https_addr = listen_addr(&config.http.host, config.http.https_port)?;

    let acceptor = start_acme(&config.acme, policy)?;

    let handle = Handle::new();
    shutdown::setup_shutdown_handler(handle.clone());

    tracing::info!(%http_addr, "Starting HTTP server");
    let plain = axum_server::bind(http_addr)
        .handle(handle.clone())
        .serve(app.clone().into_make_service_with_connect_info::<SocketAddr>());

    tracing::info!(%https_addr, "Starting HTTPS server (ACME)");
    let secure = axum_server::bind(https_addr)
        .handle(handle)
        .acceptor(acceptor)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::try_join!(plain, secure)?;
    tracing::info!("Servers stopped");
    Ok(())
}

/// Configure ACME for the allowed hosts and build the TLS acceptor around it.
fn start_acme(
    settings: &AcmeSettings,
    policy: HostPolicy,
) -> Result<GatewayAcceptor, ServerError> {
    let cache_dir = settings.cache_dir();
    let directory = settings.directory_url();
    let domains = policy.acme_domains();

    tracing::info!(
        domains = ?domains,
        cache = %cache_dir.display(),
        directory = %directory,
        "Configuring ACME"
    );

    std::fs::create_dir_all(&cache_dir).map_err(|source| ServerError::CacheDir {
        path: cache_dir.clone(),
        source,
    })?;

    let mut acme_config = AcmeConfig::new(domains)
        .cache(DirCache::new(cache_dir))
        .directory(directory);

    if let Some(contact) = settings.contact.as_deref().filter(|c| !c.is_empty()) {
        acme_config = acme_config.contact_push(format!("mailto:{}", contact));
    }

    if settings.staging {
        tracing::warn!(
            "Using ACME staging mode - the ACME client does not verify the CA's certificate \
             and issued certificates will NOT be trusted by browsers"
        );
        acme_config = acme_config.client_tls_config(Arc::new(tls::staging_client_config()?));
    }

    let mut acme_state = acme_config.state();
    let resolver = Arc::new(PolicyResolver::new(policy, acme_state.resolver()));
    let server_config = tls::server_config(resolver)?;

    // Certificate ordering and renewal are driven by polling the state stream
    tokio::spawn(async move {
        loop {
            match acme_state.next().await {
                Some(Ok(event)) => {
                    tracing::info!(event = ?event, "ACME event");
                }
                Some(Err(err)) => {
                    tracing::error!(error = %err, "ACME error");
                }
                None => {
                    tracing::debug!("ACME state stream ended");
                    break;
                }
            }
        }
    });

    Ok(GatewayAcceptor::new(server_config))
}

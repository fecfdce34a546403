//! HTTP/HTTPS serving.
//!
//! This module provides the transport side of the gateway:
//! - **Listeners**: plaintext and TLS servers sharing one router
//! - **TLS policy**: protocol versions, cipher suites, ALPN, ACME certificate resolution
//! - **Responses**: 301 redirects, static resources and their security headers
//! - Graceful shutdown on SIGTERM/SIGINT

pub mod headers;
pub mod redirect;
mod server;
mod shutdown;
pub mod static_files;
pub mod tls;

pub use server::{start_server, ServerError};

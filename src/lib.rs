//! scmdhttpd - a minimal HTTPS front door
//!
//! Serves a handful of static resources for an allowlist of virtual hosts over
//! TLS, obtains certificates for exactly those hosts via ACME, and redirects
//! everything else to its canonical https URL.

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod policy;
pub mod router;
pub mod routes;
pub mod state;
pub mod vhosts;

pub use error::*;

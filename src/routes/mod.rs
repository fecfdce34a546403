//! HTTP routing for the gateway.
//!
//! There are no per-path routes: the path allowlist is host dependent and decided
//! by the router, so every request lands in one fallback handler.
//!
//! Access logging is enabled via middleware that also generates a unique request
//! ID for each incoming request, allowing correlation of all logs within a request.

pub mod gateway;

use axum::{middleware, Router};

use crate::middleware::access_log_layer;
use crate::state::GatewayState;

/// Creates the Axum router shared by the plaintext and TLS listeners.
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .fallback(gateway::handle)
        .with_state(state)
        // Access log - outermost so it sees the final status of every response
        .layer(middleware::from_fn(access_log_layer))
}

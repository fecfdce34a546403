//! The single request handler behind both listeners.
//!
//! Builds the `RequestContext`, asks the router for an `Outcome` and turns it into
//! a response. The match is exhaustive, so a new outcome cannot silently fall
//! through to serving content.

use axum::{
    extract::{Request, State},
    http::header::HOST,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::http::redirect::moved_permanently;
use crate::http::static_files::serve_resource;
use crate::http::tls::TlsInfo;
use crate::policy::DeniedReason;
use crate::router::{route, Outcome, RequestContext};
use crate::state::GatewayState;

/// Host the client asked for: the Host header, or the authority of an absolute-form target.
fn request_host(request: &Request) -> &str {
    request
        .headers()
        .get(HOST)
        .and_then(|host| host.to_str().ok())
        .or_else(|| request.uri().authority().map(|authority| authority.as_str()))
        .unwrap_or("")
}

pub async fn handle(State(state): State<GatewayState>, request: Request) -> Response {
    let is_secure = request.extensions().get::<TlsInfo>().is_some();
    let ctx = RequestContext::new(request_host(&request), request.uri().path(), is_secure)
        .with_https_port(state.https_port);

    let outcome = route(&ctx, &state.vhosts);
    tracing::debug!(
        host = %ctx.lower_host,
        secure = ctx.is_secure,
        outcome = ?outcome,
        "Routed request"
    );

    match outcome {
        Outcome::Unauthorized => GatewayError::Unauthorized(DeniedReason {
            host: ctx.canonical_domain,
            reason: "not in allowlist",
        })
        .into_response(),
        Outcome::RedirectToTarget(url)
        | Outcome::RedirectToHttps(url)
        | Outcome::RedirectToCanonicalHost(url) => moved_permanently(&url),
        Outcome::NotFound => GatewayError::NotFound(ctx.path).into_response(),
        Outcome::Serve(resource) => serve_resource(&state.content, resource, request).await,
    }
}

//! Permanent redirect responses.
//!
//! Every redirect the gateway issues is a 301 with `Connection: close`, so clients
//! reconnect (usually over TLS, or to another host) instead of pipelining further
//! requests on the connection that was just redirected.

use axum::http::header::{HeaderValue, CONNECTION, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Build a `301 Moved Permanently` response pointing at `location`.
pub fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (
            StatusCode::MOVED_PERMANENTLY,
            [
                (LOCATION, location),
                (CONNECTION, HeaderValue::from_static("close")),
            ],
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, location = %location, "Redirect location is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

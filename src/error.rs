use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::config::ConfigError;
use crate::http::ServerError;
use crate::policy::DeniedReason;
use crate::vhosts::VhostError;

/// Per-request rejections. They end the request, never the process.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Unauthorized(#[from] DeniedReason),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Unauthorized(denied) => {
                tracing::warn!(
                    host = %denied.host,
                    reason = denied.reason,
                    "Rejected request for unknown host"
                );
                (StatusCode::BAD_REQUEST, "400 bad request\n").into_response()
            }
            GatewayError::NotFound(path) => {
                tracing::debug!(path = %path, "Path not in allowlist");
                (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
            }
        }
    }
}

/// Failures that abort the process.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vhosts(#[from] VhostError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

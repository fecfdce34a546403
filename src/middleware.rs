//! Access logging middleware.
//!
//! Every request gets a UUID v4 request id and a tracing span wrapping its whole
//! lifecycle, and produces exactly one common-log-format line on the `access`
//! target once the response status is known:
//!
//! ```text
//! 192.0.2.7 - example.com [17/Oct/2026:10:04:59 +0200] "GET / HTTP/1.1" 200 - "-" "curl/8.5.0" TLS1.3 TLS13_AES_256_GCM_SHA384
//! ```
//!
//! Client-controlled values are stripped of control characters so a crafted
//! header cannot split or forge log lines.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::header::{HeaderName, HOST, REFERER, USER_AGENT},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Local};
use tracing::Instrument;
use uuid::Uuid;

use crate::http::tls::TlsInfo;

/// Tracing target of the access log lines
pub const ACCESS_LOG_TARGET: &str = "access";

/// Common log format timestamp
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Request details captured before the handler consumes the request.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub client_ip: String,
    pub vhost: String,
    pub timestamp: DateTime<Local>,
    pub method: String,
    pub target: String,
    pub protocol: String,
    pub referer: String,
    pub user_agent: String,
    pub tls: Option<TlsInfo>,
}

impl AccessRecord {
    pub fn from_request(request: &Request) -> Self {
        let header = |name: HeaderName| {
            request
                .headers()
                .get(name)
                .map(|value| sanitize(&String::from_utf8_lossy(value.as_bytes())))
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "-".to_string())
        };

        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| client_ip(&addr.to_string()))
            .unwrap_or_else(|| "-".to_string());

        Self {
            client_ip,
            vhost: header(HOST),
            timestamp: Local::now(),
            method: sanitize(request.method().as_str()),
            target: sanitize(&request.uri().to_string()),
            protocol: format!("{:?}", request.version()),
            referer: header(REFERER),
            user_agent: header(USER_AGENT),
            tls: request.extensions().get::<TlsInfo>().cloned(),
        }
    }

    /// Render the log line for a finished request.
    pub fn line(&self, status: StatusCode) -> String {
        let mut line = format!(
            "{} - {} [{}] \"{} {} {}\" {} - \"{}\" \"{}\"",
            self.client_ip,
            self.vhost,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.method,
            self.target,
            self.protocol,
            status.as_u16(),
            self.referer,
            self.user_agent,
        );
        if let Some(tls) = &self.tls {
            line.push(' ');
            line.push_str(&tls.version);
            line.push(' ');
            line.push_str(&tls.cipher_suite);
        }
        line
    }
}

/// Client address without port and without IPv6 brackets.
pub fn client_ip(remote_addr: &str) -> String {
    let host = match (remote_addr.rfind(']'), remote_addr.rfind(':')) {
        (Some(bracket), Some(colon)) if colon > bracket => &remote_addr[..colon],
        (None, Some(colon)) if remote_addr.matches(':').count() == 1 => &remote_addr[..colon],
        _ => remote_addr,
    };
    host.replace(['[', ']'], "")
}

/// Drop control characters (CR, LF, ...) from untrusted values.
pub fn sanitize(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

/// Middleware that creates the request span and writes the access log line.
///
/// This should be the outermost layer so the span wraps all request processing
/// and the logged status is the one sent to the client.
pub async fn access_log_layer(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let record = AccessRecord::from_request(&request);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %record.method,
        path = %request.uri().path(),
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::info!(target: ACCESS_LOG_TARGET, "{}", record.line(response.status()));

        response
    }
    .instrument(span)
    .await
}

//! Static file responses for allowlisted resources.
//!
//! File transfer (content type, length, conditional requests, missing files) is
//! delegated to `tower_http`'s `ServeFile`; this module only resolves which file a
//! `Resource` refers to and attaches the security headers.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::headers::apply_security_headers;
use crate::config::ContentConfig;
use crate::router::Resource;

/// Resolve a resource to its path under the content root.
pub fn resource_path(content: &ContentConfig, resource: Resource) -> PathBuf {
    let name = match resource {
        Resource::HomePage => content.home_page.as_str(),
        Resource::SecurityPolicy => content.security_txt.as_str(),
        Resource::Asset(name) => name,
    };
    content.data_dir.join(name)
}

/// Serve `resource` for `request`, with the security headers attached.
pub async fn serve_resource(
    content: &ContentConfig,
    resource: Resource,
    request: Request,
) -> Response {
    let path = resource_path(content, resource);

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    if !response.status().is_success() {
        tracing::debug!(
            path = %path.display(),
            status = response.status().as_u16(),
            "Static resource not served"
        );
    }

    apply_security_headers(response.headers_mut());
    response
}

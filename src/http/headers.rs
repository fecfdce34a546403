//! Security headers for served resources.
//!
//! Only successful `Serve` responses get these; redirects and errors carry no
//! rendered page for them to protect.

use http::header::{
    HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY,
    STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};

use crate::config;

const EXPECT_CT: HeaderName = HeaderName::from_static("expect-ct");
const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// The fixed header set, in the order it is applied.
pub const SECURITY_HEADERS: [(HeaderName, &str); 9] = [
    (STRICT_TRANSPORT_SECURITY, config::STRICT_TRANSPORT_SECURITY),
    (CONTENT_SECURITY_POLICY, config::CONTENT_SECURITY_POLICY),
    (X_XSS_PROTECTION, "0"),
    (X_FRAME_OPTIONS, "DENY"),
    (REFERRER_POLICY, "no-referrer"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (EXPECT_CT, config::EXPECT_CT),
    (PERMISSIONS_POLICY, config::PERMISSIONS_POLICY),
    (CACHE_CONTROL, config::CACHE_CONTROL_STATIC),
];

/// Insert every security header, replacing any value already present.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

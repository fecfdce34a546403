//! Per-request redirect/serve decision.
//!
//! `route` is a pure function of the request context and the vhost table. The host
//! is checked before anything path related, so an unknown host cannot learn which
//! paths exist on the canonical sites. Hosts with a redirect target are first
//! upgraded to https on their own name and only then sent to the target, so the
//! target URL is never handed out over plaintext.

use crate::config::DEFAULT_HTTPS_PORT;
use crate::policy::{normalize_host, strip_www};
use crate::vhosts::VhostTable;

/// Request paths the gateway answers for a canonical host.
pub const SERVABLE_PATHS: [&str; 6] = [
    "/",
    "/index.html",
    "/favicon.ico",
    "/robots.txt",
    "/style.css",
    "/.well-known/security.txt",
];

/// What a servable path maps to on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// `/`, resolved to the configured home page
    HomePage,
    /// `/.well-known/security.txt`, resolved to the configured security policy file
    SecurityPolicy,
    /// Any other allowlisted path, same name under the content root
    Asset(&'static str),
}

impl Resource {
    /// Map a request path onto the allowlist.
    pub fn for_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Resource::HomePage),
            "/.well-known/security.txt" => Some(Resource::SecurityPolicy),
            "/index.html" => Some(Resource::Asset("index.html")),
            "/favicon.ico" => Some(Resource::Asset("favicon.ico")),
            "/robots.txt" => Some(Resource::Asset("robots.txt")),
            "/style.css" => Some(Resource::Asset("style.css")),
            _ => None,
        }
    }
}

/// Routing decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Host is not in the allowlist
    Unauthorized,
    /// Host is an alias; send the client to the configured target
    RedirectToTarget(String),
    /// Plaintext request; upgrade to https on the same host
    RedirectToHttps(String),
    /// Request used the `www.` alias of a canonical host
    RedirectToCanonicalHost(String),
    /// Serve an allowlisted resource
    Serve(Resource),
    /// Known host, path outside the allowlist
    NotFound,
}

/// Everything the router needs to know about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub raw_host: String,
    /// Lowercase host without port
    pub lower_host: String,
    /// `lower_host` without one leading `www.`
    pub canonical_domain: String,
    pub wants_www_strip: bool,
    pub is_secure: bool,
    pub path: String,
    /// Port of the TLS listener, appended to https redirects when not 443
    pub https_port: u16,
}

impl RequestContext {
    pub fn new(raw_host: &str, path: &str, is_secure: bool) -> Self {
        let lower_host = normalize_host(strip_port(raw_host));
        let (canonical_domain, wants_www_strip) = strip_www(&lower_host);
        let canonical_domain = canonical_domain.to_string();

        Self {
            raw_host: raw_host.to_string(),
            lower_host,
            canonical_domain,
            wants_www_strip,
            is_secure,
            path: path.to_string(),
            https_port: DEFAULT_HTTPS_PORT,
        }
    }

    pub fn with_https_port(mut self, https_port: u16) -> Self {
        self.https_port = https_port;
        self
    }

    fn https_url(&self, host: &str, path: &str) -> String {
        if self.https_port == DEFAULT_HTTPS_PORT {
            format!("https://{}{}", host, path)
        } else {
            format!("https://{}:{}{}", host, self.https_port, path)
        }
    }
}

/// Remove a `:port` suffix, keeping bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Decide what to do with a request. First match wins.
pub fn route(ctx: &RequestContext, vhosts: &VhostTable) -> Outcome {
    let Some(redirect_target) = vhosts.get(&ctx.canonical_domain) else {
        return Outcome::Unauthorized;
    };

    if let Some(target) = redirect_target {
        if !ctx.is_secure {
            return Outcome::RedirectToHttps(ctx.https_url(&ctx.lower_host, "/"));
        }
        return Outcome::RedirectToTarget(target.to_string());
    }

    let Some(resource) = Resource::for_path(&ctx.path) else {
        return Outcome::NotFound;
    };

    if !ctx.is_secure {
        Outcome::RedirectToHttps(ctx.https_url(&ctx.lower_host, &ctx.path))
    } else if ctx.wants_www_strip {
        Outcome::RedirectToCanonicalHost(ctx.https_url(&ctx.canonical_domain, &ctx.path))
    } else {
        Outcome::Serve(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> VhostTable {
        VhostTable::parse("example.com\nold.example https://new.example/\n")
    }

    fn plain(host: &str, path: &str) -> Outcome {
        route(&RequestContext::new(host, path, false), &table())
    }

    fn secure(host: &str, path: &str) -> Outcome {
        route(&RequestContext::new(host, path, true), &table())
    }

    #[test]
    fn test_context_derivation() {
        let ctx = RequestContext::new("WWW.Example.com:8443", "/style.css", true);
        assert_eq!(ctx.raw_host, "WWW.Example.com:8443");
        assert_eq!(ctx.lower_host, "www.example.com");
        assert_eq!(ctx.canonical_domain, "example.com");
        assert!(ctx.wants_www_strip);
        assert!(ctx.is_secure);
        assert_eq!(ctx.path, "/style.css");
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:443"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
    }

    #[test]
    fn test_unknown_host_is_unauthorized() {
        assert_eq!(plain("evil.example", "/"), Outcome::Unauthorized);
        assert_eq!(secure("www.evil.example", "/"), Outcome::Unauthorized);
        assert_eq!(secure("EVIL.example", "/nope"), Outcome::Unauthorized);
    }

    #[test]
    fn test_unknown_host_never_reaches_path_logic() {
        assert_eq!(secure("evil.example", "/robots.txt"), Outcome::Unauthorized);
        assert_eq!(secure("evil.example", "/unknown.txt"), Outcome::Unauthorized);
    }

    #[test]
    fn test_alias_over_plaintext_upgrades_same_host() {
        assert_eq!(
            plain("old.example", "/anything"),
            Outcome::RedirectToHttps("https://old.example/".to_string())
        );
    }

    #[test]
    fn test_alias_www_over_plaintext_keeps_www() {
        assert_eq!(
            plain("www.old.example", "/"),
            Outcome::RedirectToHttps("https://www.old.example/".to_string())
        );
    }

    #[test]
    fn test_alias_over_tls_redirects_to_target() {
        assert_eq!(
            secure("old.example", "/anything"),
            Outcome::RedirectToTarget("https://new.example/".to_string())
        );
        assert_eq!(
            secure("www.OLD.example", "/"),
            Outcome::RedirectToTarget("https://new.example/".to_string())
        );
    }

    #[test]
    fn test_canonical_plaintext_upgrades() {
        assert_eq!(
            plain("example.com", "/"),
            Outcome::RedirectToHttps("https://example.com/".to_string())
        );
        assert_eq!(
            plain("www.example.com", "/robots.txt"),
            Outcome::RedirectToHttps("https://www.example.com/robots.txt".to_string())
        );
    }

    #[test]
    fn test_www_over_tls_redirects_to_canonical() {
        assert_eq!(
            secure("www.example.com", "/"),
            Outcome::RedirectToCanonicalHost("https://example.com/".to_string())
        );
    }

    #[test]
    fn test_canonical_serves_allowlisted_paths() {
        assert_eq!(secure("example.com", "/"), Outcome::Serve(Resource::HomePage));
        assert_eq!(
            secure("example.com", "/.well-known/security.txt"),
            Outcome::Serve(Resource::SecurityPolicy)
        );
        assert_eq!(
            secure("Example.COM", "/favicon.ico"),
            Outcome::Serve(Resource::Asset("favicon.ico"))
        );
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        assert_eq!(secure("example.com", "/unknown.txt"), Outcome::NotFound);
        assert_eq!(plain("example.com", "/unknown.txt"), Outcome::NotFound);
        assert_eq!(secure("www.example.com", "/../vhosts.conf"), Outcome::NotFound);
    }

    #[test]
    fn test_every_servable_path_has_a_resource() {
        for path in SERVABLE_PATHS {
            assert!(Resource::for_path(path).is_some(), "{path}");
        }
    }

    #[test]
    fn test_https_port_suffix() {
        let ctx = RequestContext::new("example.com:8080", "/", false).with_https_port(8443);
        assert_eq!(
            route(&ctx, &table()),
            Outcome::RedirectToHttps("https://example.com:8443/".to_string())
        );
    }
}

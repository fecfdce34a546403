//! Host authorization for certificate issuance.
//!
//! `HostPolicy` is the only gate between a client-supplied hostname (SNI or Host
//! header) and the ACME client. A hostname is authorized iff its canonical form
//! (lowercase, without one leading `www.`) is a key of the vhost table, so
//! arbitrary names pointed at this server can never trigger certificate orders.

use std::fmt;
use std::sync::Arc;

use crate::vhosts::VhostTable;

/// Prefix accepted as an alias of every configured host
pub const WWW_PREFIX: &str = "www.";

/// Why a hostname was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("host {host} denied: {reason}")]
pub struct DeniedReason {
    pub host: String,
    pub reason: &'static str,
}

/// Lowercase a hostname and drop a trailing root dot.
pub fn normalize_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    match lower.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Strip one leading `www.`; the flag tells whether it was present.
pub fn strip_www(host: &str) -> (&str, bool) {
    match host.strip_prefix(WWW_PREFIX) {
        Some(domain) => (domain, true),
        None => (host, false),
    }
}

/// Read-only authorization predicate over the vhost table.
#[derive(Clone)]
pub struct HostPolicy {
    vhosts: Arc<VhostTable>,
}

impl fmt::Debug for HostPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPolicy")
            .field("hosts", &self.vhosts.len())
            .finish()
    }
}

impl HostPolicy {
    pub fn new(vhosts: Arc<VhostTable>) -> Self {
        Self { vhosts }
    }

    /// Accept `host` iff its canonical form is a configured vhost.
    pub fn authorize(&self, host: &str) -> Result<(), DeniedReason> {
        let normalized = normalize_host(host);
        let (domain, _) = strip_www(&normalized);

        if self.vhosts.contains(domain) {
            Ok(())
        } else {
            Err(DeniedReason {
                host: domain.to_string(),
                reason: "not in allowlist",
            })
        }
    }

    /// Names requested from the CA: every configured host plus its `www.` alias.
    pub fn acme_domains(&self) -> Vec<String> {
        self.vhosts
            .hostnames()
            .into_iter()
            .flat_map(|host| [host.to_string(), format!("{WWW_PREFIX}{host}")])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> HostPolicy {
        let table = VhostTable::parse("example.com\nold.example https://example.com/\n");
        HostPolicy::new(Arc::new(table))
    }

    #[test]
    fn test_authorize_known_host() {
        assert!(policy().authorize("example.com").is_ok());
        assert!(policy().authorize("old.example").is_ok());
    }

    #[test]
    fn test_authorize_is_case_insensitive() {
        assert!(policy().authorize("EXAMPLE.com").is_ok());
        assert!(policy().authorize("WWW.Example.COM").is_ok());
    }

    #[test]
    fn test_authorize_www_alias() {
        assert!(policy().authorize("www.example.com").is_ok());
    }

    #[test]
    fn test_authorize_strips_www_only_once() {
        assert!(policy().authorize("www.www.example.com").is_err());
    }

    #[test]
    fn test_authorize_accepts_fqdn_dot() {
        assert!(policy().authorize("example.com.").is_ok());
    }

    #[test]
    fn test_authorize_denies_unknown_host() {
        let err = policy().authorize("www.Evil.example").unwrap_err();
        assert_eq!(
            err,
            DeniedReason {
                host: "evil.example".to_string(),
                reason: "not in allowlist",
            }
        );
        assert_eq!(err.to_string(), "host evil.example denied: not in allowlist");
    }

    #[test]
    fn test_authorize_denies_subdomain() {
        assert!(policy().authorize("mail.example.com").is_err());
        assert!(policy().authorize("").is_err());
    }

    #[test]
    fn test_acme_domains_include_www_alias() {
        assert_eq!(
            policy().acme_domains(),
            vec![
                "example.com",
                "www.example.com",
                "old.example",
                "www.old.example"
            ]
        );
    }

    #[test]
    fn test_strip_www() {
        assert_eq!(strip_www("www.example.com"), ("example.com", true));
        assert_eq!(strip_www("example.com"), ("example.com", false));
        assert_eq!(strip_www("wwwexample.com"), ("wwwexample.com", false));
    }
}

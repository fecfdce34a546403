//! Configuration loading and constants.
//!
//! Loads gateway configuration from an optional TOML file and defines constants for
//! listener ports, ACME directories, the security response headers, logging and
//! default paths. `GatewayConfig` is the root configuration struct containing all settings.

use const_format::formatcp;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// Security Response Headers
// =============================================================================
// Fixed values attached to every served resource. Redirects and errors never
// carry them.

/// HSTS lifetime in seconds (one year)
pub const HSTS_MAX_AGE: u32 = 31_536_000;

/// Expect-CT enforcement window in seconds
pub const EXPECT_CT_MAX_AGE: u32 = 6_048_000;

/// Freshness lifetime for served resources (one day)
pub const HTTP_CACHE_STATIC_MAX_AGE: u32 = 86_400;

pub const STRICT_TRANSPORT_SECURITY: &str =
    formatcp!("max-age={}; includeSubDomains", HSTS_MAX_AGE);

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; img-src 'self'; style-src 'self'; \
     form-action 'none'; base-uri 'self'; frame-ancestors 'none'; upgrade-insecure-requests";

pub const EXPECT_CT: &str = formatcp!("max-age={}, enforce", EXPECT_CT_MAX_AGE);

pub const PERMISSIONS_POLICY: &str = "browsing-topics=(), interest-cohort=()";

pub const CACHE_CONTROL_STATIC: &str =
    formatcp!("public, max-age={}, must-revalidate", HTTP_CACHE_STATIC_MAX_AGE);

// =============================================================================
// ACME
// =============================================================================

/// Let's Encrypt production directory
pub const LETS_ENCRYPT_PRODUCTION_DIRECTORY: &str =
    "https://acme-v02.api.letsencrypt.org/directory";

/// Let's Encrypt staging directory (untrusted certificates, relaxed rate limits)
pub const LETS_ENCRYPT_STAGING_DIRECTORY: &str =
    "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Subdirectory of the certificate directory handed to the ACME cache
pub const CERTS_SUBDIR: &str = "certs";

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Name of the vhost allowlist inside the data directory
pub const VHOSTS_FILE: &str = "vhosts.conf";

/// Default data directory (vhosts.conf and the served content)
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Default certificate directory
pub const DEFAULT_CERTIFICATE_DIR: &str = "certificate-dir";

/// Default home page resource, relative to the data directory
pub const DEFAULT_HOME_PAGE: &str = "index.html";

/// Default security.txt resource, relative to the data directory
pub const DEFAULT_SECURITY_TXT: &str = "security.txt";

/// Default bind address for both listeners
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Seconds to wait for open connections during graceful shutdown
pub const SHUTDOWN_GRACE_SECS: u64 = 30;

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "scmdhttpd=info,access=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Listener configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// Certificate issuance settings
    #[serde(default)]
    pub acme: AcmeSettings,
    /// Served content and vhost allowlist location
    #[serde(default)]
    pub content: ContentConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration shared by the plaintext and TLS servers
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_http_port")]
    pub http_port: u16,
    #[serde(default = "HttpServerConfig::default_https_port")]
    pub https_port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            http_port: Self::default_http_port(),
            https_port: Self::default_https_port(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_BIND_HOST.to_string()
    }

    fn default_http_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_https_port() -> u16 {
        DEFAULT_HTTPS_PORT
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcmeSettings {
    /// Directory in which to store the account key and certificates
    #[serde(default = "AcmeSettings::default_certificate_dir")]
    pub certificate_dir: PathBuf,
    /// Custom ACME directory URL. Takes precedence over `staging`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Use the Let's Encrypt staging environment
    #[serde(default)]
    pub staging: bool,
    /// Contact e-mail registered with the ACME account
    #[serde(default)]
    pub contact: Option<String>,
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            certificate_dir: Self::default_certificate_dir(),
            endpoint: None,
            staging: false,
            contact: None,
        }
    }
}

impl AcmeSettings {
    fn default_certificate_dir() -> PathBuf {
        PathBuf::from(DEFAULT_CERTIFICATE_DIR)
    }

    /// ACME directory URL: explicit endpoint, then staging, then production.
    pub fn directory_url(&self) -> &str {
        match self.endpoint.as_deref() {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ if self.staging => LETS_ENCRYPT_STAGING_DIRECTORY,
            _ => LETS_ENCRYPT_PRODUCTION_DIRECTORY,
        }
    }

    /// Directory handed to the ACME certificate cache
    pub fn cache_dir(&self) -> PathBuf {
        self.certificate_dir.join(CERTS_SUBDIR)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Directory holding vhosts.conf and the served files
    #[serde(default = "ContentConfig::default_data_dir")]
    pub data_dir: PathBuf,
    /// File served for `/`
    #[serde(default = "ContentConfig::default_home_page")]
    pub home_page: String,
    /// File served for `/.well-known/security.txt`
    #[serde(default = "ContentConfig::default_security_txt")]
    pub security_txt: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            home_page: Self::default_home_page(),
            security_txt: Self::default_security_txt(),
        }
    }
}

impl ContentConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from(DEFAULT_DATA_DIR)
    }

    fn default_home_page() -> String {
        DEFAULT_HOME_PAGE.to_string()
    }

    fn default_security_txt() -> String {
        DEFAULT_SECURITY_TXT.to_string()
    }

    pub fn vhosts_path(&self) -> PathBuf {
        self.data_dir.join(VHOSTS_FILE)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http.http_port == self.http.https_port {
            return Err(ConfigError::Validation(format!(
                "http_port and https_port must differ (both are {})",
                self.http.http_port
            )));
        }

        match self.logging.format.to_ascii_lowercase().as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Unknown logging.format '{}', expected \"text\" or \"json\"",
                    other
                )))
            }
        }

        if self.content.home_page.is_empty() || self.content.security_txt.is_empty() {
            return Err(ConfigError::Validation(
                "content.home_page and content.security_txt must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.http.http_port, 80);
        assert_eq!(config.http.https_port, 443);
        assert_eq!(config.content.data_dir, PathBuf::from("/data"));
        assert_eq!(config.content.vhosts_path(), PathBuf::from("/data/vhosts.conf"));
        assert!(!config.acme.staging);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_directory_url_precedence() {
        let mut acme = AcmeSettings::default();
        assert_eq!(acme.directory_url(), LETS_ENCRYPT_PRODUCTION_DIRECTORY);

        acme.staging = true;
        assert_eq!(acme.directory_url(), LETS_ENCRYPT_STAGING_DIRECTORY);

        acme.endpoint = Some("https://ca.internal/directory".to_string());
        assert_eq!(acme.directory_url(), "https://ca.internal/directory");

        acme.endpoint = Some(String::new());
        assert_eq!(acme.directory_url(), LETS_ENCRYPT_STAGING_DIRECTORY);
    }

    #[test]
    fn test_cache_dir_is_certs_subdir() {
        let acme = AcmeSettings {
            certificate_dir: PathBuf::from("/var/lib/scmd"),
            ..Default::default()
        };
        assert_eq!(acme.cache_dir(), PathBuf::from("/var/lib/scmd/certs"));
    }

    #[test]
    fn test_load_rejects_same_ports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scmdhttpd.toml");
        std::fs::write(&path, "[http]\nhttp_port = 8080\nhttps_port = 8080\n").unwrap();

        let err = GatewayConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_rejects_unknown_log_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scmdhttpd.toml");
        std::fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

        assert!(matches!(
            GatewayConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scmdhttpd.toml");
        std::fs::write(
            &path,
            "[acme]\nstaging = true\ncontact = \"ops@example.com\"\n\n[content]\ndata_dir = \"/srv/www\"\n",
        )
        .unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert!(config.acme.staging);
        assert_eq!(config.acme.contact.as_deref(), Some("ops@example.com"));
        assert_eq!(config.content.data_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.content.home_page, "index.html");
        assert_eq!(config.http.https_port, 443);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            GatewayConfig::load("/nonexistent/scmdhttpd.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}

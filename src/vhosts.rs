//! Virtual host allowlist.
//!
//! `vhosts.conf` holds one record per line: a hostname, optionally followed by an
//! absolute URL every request for that host is permanently redirected to. Lines
//! starting with `#` are comments, and a field starting with `#` begins a trailing
//! comment. The table is built once at startup and never mutated afterwards, so it
//! is shared between requests behind an `Arc`.
//!
//! ```text
//! # canonical, served host (www.example.com is accepted as an alias)
//! example.com
//! # retired domain, redirected after upgrading to https
//! old.example https://example.com/
//! ```

use std::collections::HashMap;
use std::path::Path;

/// A single configured virtual host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhostEntry {
    /// Lowercase hostname, the table key
    pub hostname: String,
    /// Redirect target; `None` marks the host as canonical and servable
    pub redirect_target: Option<String>,
}

/// Immutable hostname -> redirect target mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VhostTable {
    hosts: HashMap<String, Option<String>>,
}

impl VhostTable {
    /// Read and parse a vhost file.
    ///
    /// Any read failure is returned to the caller; the process must not start
    /// serving without an allowlist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VhostError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| VhostError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let table = Self::parse(&contents);
        if table.is_empty() {
            return Err(VhostError::Empty(path.display().to_string()));
        }

        tracing::info!(
            path = %path.display(),
            hosts = table.len(),
            "Loaded vhost table"
        );
        Ok(table)
    }

    /// Parse vhost records. Malformed records are skipped with a diagnostic.
    pub fn parse(contents: &str) -> Self {
        let mut hosts = HashMap::new();

        for (index, line) in contents.lines().enumerate() {
            let line_number = index + 1;
            let record = line.trim_start();

            if line.is_empty() || record.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = record
                .split_whitespace()
                .take_while(|field| !field.starts_with('#'))
                .collect();
            let (hostname, redirect_target) = match fields.as_slice() {
                [] => {
                    tracing::warn!(line = line_number, "Ignoring vhost record without fields");
                    continue;
                }
                [hostname] => (hostname.to_lowercase(), None),
                [hostname, target, extra @ ..] => {
                    if !extra.is_empty() {
                        tracing::warn!(
                            line = line_number,
                            host = %hostname,
                            ignored = ?extra,
                            "Ignoring extra fields in vhost record"
                        );
                    }
                    if !is_valid_redirect_target(target) {
                        tracing::warn!(
                            line = line_number,
                            host = %hostname,
                            target = %target,
                            "Ignoring vhost record with invalid redirect target"
                        );
                        continue;
                    }
                    (hostname.to_lowercase(), Some(target.to_string()))
                }
            };

            if hosts.contains_key(&hostname) {
                tracing::warn!(
                    line = line_number,
                    host = %hostname,
                    "Duplicate vhost record overrides an earlier one"
                );
            }
            hosts.insert(hostname, redirect_target);
        }

        Self { hosts }
    }

    /// Look up a host. The outer `Option` is presence, the inner one the redirect target.
    pub fn get(&self, hostname: &str) -> Option<Option<&str>> {
        self.hosts.get(hostname).map(|target| target.as_deref())
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.hosts.contains_key(hostname)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Configured hostnames, sorted for stable output.
    pub fn hostnames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hosts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All entries, sorted by hostname.
    pub fn entries(&self) -> Vec<VhostEntry> {
        self.hostnames()
            .into_iter()
            .map(|hostname| VhostEntry {
                hostname: hostname.to_string(),
                redirect_target: self.hosts[hostname].clone(),
            })
            .collect()
    }
}

/// Redirect targets end up in a `Location` header verbatim.
fn is_valid_redirect_target(target: &str) -> bool {
    (has_scheme(target, "https://") || has_scheme(target, "http://"))
        && http::HeaderValue::from_str(target).is_ok()
}

/// Schemes compare case-insensitively (RFC 3986, section 3.1).
fn has_scheme(target: &str, scheme: &str) -> bool {
    target
        .get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

#[derive(Debug, thiserror::Error)]
pub enum VhostError {
    #[error("Failed to read vhost file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No virtual hosts configured in {0}")]
    Empty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# canonical hosts
example.com
  Example.ORG

# retired
old.example https://new.example/
";

    #[test]
    fn test_parse_single_field_is_servable() {
        let table = VhostTable::parse(SAMPLE);
        assert_eq!(table.get("example.com"), Some(None));
    }

    #[test]
    fn test_parse_lowercases_and_trims_leading_space() {
        let table = VhostTable::parse(SAMPLE);
        assert_eq!(table.get("example.org"), Some(None));
        assert!(!table.contains("Example.ORG"));
    }

    #[test]
    fn test_parse_redirect_target_verbatim() {
        let table = VhostTable::parse("Old.Example https://New.Example/Path\n");
        assert_eq!(
            table.get("old.example"),
            Some(Some("https://New.Example/Path"))
        );
    }

    #[test]
    fn test_parse_ignores_comments_and_blank_lines() {
        let table = VhostTable::parse(SAMPLE);
        assert_eq!(table.len(), 3);
        assert!(!table.contains("#"));
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let table = VhostTable::parse("a.example https://b.example/ trailing junk\n");
        assert_eq!(table.get("a.example"), Some(Some("https://b.example/")));
    }

    #[test]
    fn test_parse_skips_whitespace_only_record() {
        let table = VhostTable::parse("   \nexample.com\n\t\n");
        assert_eq!(table.hostnames(), vec!["example.com"]);
    }

    #[test]
    fn test_parse_skips_invalid_redirect_target() {
        let table = VhostTable::parse("a.example not-a-url\nb.example\n");
        assert!(!table.contains("a.example"));
        assert!(table.contains("b.example"));
    }

    #[test]
    fn test_parse_uppercase_scheme_target() {
        let table =
            VhostTable::parse("old.example HTTPS://new.example/\nlegacy.example Http://x.example/\n");
        assert_eq!(table.get("old.example"), Some(Some("HTTPS://new.example/")));
        assert_eq!(table.get("legacy.example"), Some(Some("Http://x.example/")));
    }

    #[test]
    fn test_parse_trailing_comment() {
        let table = VhostTable::parse(
            "example.com # main site\nold.example https://example.com/ # retired 2019\n",
        );
        assert_eq!(table.get("example.com"), Some(None));
        assert_eq!(table.get("old.example"), Some(Some("https://example.com/")));
    }

    #[test]
    fn test_parse_short_target_rejected() {
        let table = VhostTable::parse("a.example http:\n");
        assert!(!table.contains("a.example"));
    }

    #[test]
    fn test_parse_last_write_wins() {
        let table = VhostTable::parse("a.example https://one.example/\nA.EXAMPLE\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a.example"), Some(None));
    }

    #[test]
    fn test_unknown_host_is_absent() {
        let table = VhostTable::parse(SAMPLE);
        assert_eq!(table.get("unknown.example"), None);
    }

    #[test]
    fn test_entries_sorted() {
        let table = VhostTable::parse(SAMPLE);
        let entries = table.entries();
        assert_eq!(entries[0].hostname, "example.com");
        assert_eq!(entries[2].hostname, "old.example");
        assert_eq!(
            entries[2].redirect_target.as_deref(),
            Some("https://new.example/")
        );
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vhosts.conf");
        std::fs::write(&path, SAMPLE).unwrap();

        let first = VhostTable::load(&path).unwrap();
        let second = VhostTable::load(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.entries(), second.entries());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = VhostTable::load("/nonexistent/vhosts.conf").unwrap_err();
        assert!(matches!(err, VhostError::Read { .. }));
    }

    #[test]
    fn test_load_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vhosts.conf");
        std::fs::write(&path, "# nothing here\n").unwrap();

        assert!(matches!(VhostTable::load(&path), Err(VhostError::Empty(_))));
    }
}

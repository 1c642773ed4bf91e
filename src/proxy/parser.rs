//! Proxy list parser for plain-text candidate files

use crate::proxy::models::{all_protocols, Candidate, Protocol, ProxyAddress};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// `scheme://host:port` with an optional trailing slash
static URL_FORMAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*)://([^:/@\s]+):(\d{1,5})/?$")
        .expect("Invalid proxy URL regex")
});

/// Parser turning proxy list lines into candidates
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy line
    ///
    /// Supports formats:
    /// - HOST:PORT, claiming both HTTP and HTTPS
    /// - http://HOST:PORT, claiming HTTP only
    /// - https://HOST:PORT, claiming HTTPS only
    ///
    /// Blank lines, `#` comments and other schemes yield `None`.
    pub fn parse_line(line: &str) -> Option<Candidate> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if line.contains("://") {
            return Self::parse_url_format(line);
        }

        Self::parse_colon_format(line)
    }

    /// Parse `scheme://host:port`
    fn parse_url_format(line: &str) -> Option<Candidate> {
        let caps = URL_FORMAT_REGEX.captures(line)?;

        let Some(protocol) = Protocol::from_name(&caps[1]) else {
            warn!(line, "skipping proxy with unsupported scheme");
            return None;
        };
        let port = Self::parse_port(&caps[3])?;

        Some(Candidate::new(
            ProxyAddress::new(&caps[2], port),
            BTreeSet::from([protocol]),
        ))
    }

    /// Parse `host:port`
    fn parse_colon_format(line: &str) -> Option<Candidate> {
        let (host, port) = line.split_once(':')?;
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return None;
        }
        let port = Self::parse_port(port)?;

        Some(Candidate::new(ProxyAddress::new(host, port), all_protocols()))
    }

    fn parse_port(s: &str) -> Option<u16> {
        s.parse::<u16>().ok().filter(|&port| port != 0)
    }

    /// Parse candidates from a string (multiple lines).
    ///
    /// Repeated addresses keep their first occurrence.
    pub fn parse_string(content: &str) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let candidates: Vec<_> = content
            .lines()
            .filter_map(Self::parse_line)
            .filter(|c| seen.insert(c.address.clone()))
            .collect();
        debug!(count = candidates.len(), "parsed proxy list");
        candidates
    }

    /// Parse candidates from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Candidate>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_string(&content))
    }
}

//! Candidate, probe outcome and validation result models

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Protocol a candidate can forward.
///
/// The derived ordering puts `Http` before `Https`, which is the evaluation
/// order used when reconciling a candidate's probe outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// Parse a protocol name as reported by proxy sources.
    ///
    /// Names other than `http` and `https` (e.g. `socks4`) return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

/// Both protocols, the default claim for bare `host:port` entries.
pub fn all_protocols() -> BTreeSet<Protocol> {
    [Protocol::Http, Protocol::Https].into_iter().collect()
}

/// Proxy address as `host` and `port`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyAddress {
    pub host: String,
    pub port: u16,
}

impl ProxyAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Proxy URL used to reach this address as a plain HTTP proxy.
    /// IPv6 literals are bracketed.
    pub fn proxy_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Descriptive data reported by the proxy source. Never validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub country: Option<String>,
    pub anonymity_level: Option<String>,
    /// Advertised speed as reported by the source
    pub speed: Option<f64>,
    /// Advertised uptime percentage
    pub uptime: Option<f64>,
}

impl CandidateMetadata {
    pub fn country_display(&self) -> &str {
        self.country.as_deref().unwrap_or("Unknown")
    }

    pub fn anonymity_display(&self) -> &str {
        self.anonymity_level.as_deref().unwrap_or("Unknown")
    }

    pub fn speed_display(&self) -> String {
        self.speed.unwrap_or(0.0).to_string()
    }

    pub fn uptime_display(&self) -> String {
        format!("{}%", self.uptime.unwrap_or(0.0))
    }
}

/// A proxy endpoint awaiting validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub address: ProxyAddress,
    /// Protocols the candidate claims to support; one probe runs per entry
    pub protocols: BTreeSet<Protocol>,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    pub fn new(address: ProxyAddress, protocols: BTreeSet<Protocol>) -> Self {
        Self {
            address,
            protocols,
            metadata: CandidateMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: CandidateMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn claims(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }
}

/// How a single probe ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus {
    Succeeded { elapsed_ms: u64 },
    Failed(ProbeError),
}

/// Result of one probe against one protocol
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub protocol: Protocol,
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn succeeded(protocol: Protocol, elapsed_ms: u64) -> Self {
        Self {
            protocol,
            status: ProbeStatus::Succeeded { elapsed_ms },
        }
    }

    pub fn failed(protocol: Protocol, error: ProbeError) -> Self {
        Self {
            protocol,
            status: ProbeStatus::Failed(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ProbeStatus::Succeeded { .. })
    }

    pub fn elapsed_ms(&self) -> Option<u64> {
        match self.status {
            ProbeStatus::Succeeded { elapsed_ms } => Some(elapsed_ms),
            ProbeStatus::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.status {
            ProbeStatus::Succeeded { .. } => None,
            ProbeStatus::Failed(e) => Some(e),
        }
    }
}

/// Validation result for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub address: ProxyAddress,
    pub metadata: CandidateMetadata,
    pub http_ok: bool,
    pub https_ok: bool,
    /// Elapsed time of the first successful probe, HTTP before HTTPS
    pub latency_ms: Option<u64>,
    /// Detail of the first failed probe, HTTP before HTTPS
    pub error: Option<String>,
}

impl ValidationResult {
    /// Fold a candidate's probe outcomes into its result.
    ///
    /// Outcomes are evaluated HTTP first regardless of the order in which
    /// they completed. Outcomes for protocols the candidate never claimed
    /// are ignored.
    pub fn reconcile(candidate: Candidate, mut outcomes: Vec<ProbeOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.protocol);

        let mut result = Self {
            address: candidate.address,
            metadata: candidate.metadata,
            http_ok: false,
            https_ok: false,
            latency_ms: None,
            error: None,
        };

        for outcome in outcomes {
            if !candidate.protocols.contains(&outcome.protocol) {
                continue;
            }
            match outcome.status {
                ProbeStatus::Succeeded { elapsed_ms } => {
                    match outcome.protocol {
                        Protocol::Http => result.http_ok = true,
                        Protocol::Https => result.https_ok = true,
                    }
                    if result.latency_ms.is_none() {
                        result.latency_ms = Some(elapsed_ms);
                    }
                }
                ProbeStatus::Failed(error) => {
                    if result.error.is_none() {
                        result.error = Some(error.to_string());
                    }
                }
            }
        }

        result
    }

    pub fn is_working(&self) -> bool {
        self.http_ok || self.https_ok
    }

    /// Protocols whose probe succeeded, in evaluation order
    pub fn working_protocols(&self) -> Vec<Protocol> {
        let mut protocols = Vec::with_capacity(2);
        if self.http_ok {
            protocols.push(Protocol::Http);
        }
        if self.https_ok {
            protocols.push(Protocol::Https);
        }
        protocols
    }

    /// Working protocols as `HTTP, HTTPS`
    pub fn protocols_label(&self) -> String {
        self.working_protocols()
            .iter()
            .map(Protocol::label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn candidate(protocols: &[Protocol]) -> Candidate {
        Candidate::new(
            ProxyAddress::new("1.2.3.4", 8080),
            protocols.iter().copied().collect(),
        )
    }

    #[test]
    fn test_protocol_from_name() {
        assert_eq!(Protocol::from_name("http"), Some(Protocol::Http));
        assert_eq!(Protocol::from_name("HTTPS"), Some(Protocol::Https));
        assert_eq!(Protocol::from_name("socks5"), None);
    }

    #[test]
    fn test_address_display() {
        let address = ProxyAddress::new("127.0.0.1", 3128);
        assert_eq!(address.to_string(), "127.0.0.1:3128");
        assert_eq!(address.proxy_url(), "http://127.0.0.1:3128");
    }

    #[test]
    fn test_ipv6_proxy_url_is_bracketed() {
        let address = ProxyAddress::new("2001:db8::1", 8080);
        assert_eq!(address.proxy_url(), "http://[2001:db8::1]:8080");
        assert_eq!(
            ProxyAddress::new("[::1]", 8080).proxy_url(),
            "http://[::1]:8080"
        );
    }

    #[test]
    fn test_reconcile_no_protocols() {
        let result = ValidationResult::reconcile(candidate(&[]), Vec::new());
        assert!(!result.http_ok);
        assert!(!result.https_ok);
        assert!(result.latency_ms.is_none());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_reconcile_http_ok_https_timeout() {
        let outcomes = vec![
            ProbeOutcome::failed(Protocol::Https, ProbeError::Timeout(Duration::from_secs(10))),
            ProbeOutcome::succeeded(Protocol::Http, 120),
        ];
        let result =
            ValidationResult::reconcile(candidate(&[Protocol::Http, Protocol::Https]), outcomes);

        assert!(result.http_ok);
        assert!(!result.https_ok);
        assert_eq!(result.latency_ms, Some(120));
        assert_eq!(
            result.error,
            Some(ProbeError::Timeout(Duration::from_secs(10)).to_string())
        );
    }

    #[test]
    fn test_reconcile_http_latency_wins_over_faster_https() {
        let outcomes = vec![
            ProbeOutcome::succeeded(Protocol::Https, 50),
            ProbeOutcome::succeeded(Protocol::Http, 300),
        ];
        let result =
            ValidationResult::reconcile(candidate(&[Protocol::Http, Protocol::Https]), outcomes);
        assert_eq!(result.latency_ms, Some(300));
        assert_eq!(result.protocols_label(), "HTTP, HTTPS");
    }

    #[test]
    fn test_reconcile_http_error_preferred() {
        let outcomes = vec![
            ProbeOutcome::failed(Protocol::Https, ProbeError::Status(502)),
            ProbeOutcome::failed(Protocol::Http, ProbeError::Connect("refused".to_string())),
        ];
        let result =
            ValidationResult::reconcile(candidate(&[Protocol::Http, Protocol::Https]), outcomes);
        assert!(!result.is_working());
        assert!(result.latency_ms.is_none());
        assert_eq!(
            result.error,
            Some(ProbeError::Connect("refused".to_string()).to_string())
        );
    }

    #[test]
    fn test_reconcile_ignores_unclaimed_protocol() {
        let outcomes = vec![ProbeOutcome::succeeded(Protocol::Https, 80)];
        let result = ValidationResult::reconcile(candidate(&[Protocol::Http]), outcomes);
        assert!(!result.https_ok);
        assert!(result.latency_ms.is_none());
    }

    #[test]
    fn test_https_only_success() {
        let outcomes = vec![ProbeOutcome::succeeded(Protocol::Https, 75)];
        let result = ValidationResult::reconcile(candidate(&[Protocol::Https]), outcomes);
        assert!(result.is_working());
        assert_eq!(result.latency_ms, Some(75));
        assert_eq!(result.protocols_label(), "HTTPS");
    }

    #[test]
    fn test_metadata_display_defaults() {
        let metadata = CandidateMetadata::default();
        assert_eq!(metadata.country_display(), "Unknown");
        assert_eq!(metadata.anonymity_display(), "Unknown");
        assert_eq!(metadata.speed_display(), "0");
        assert_eq!(metadata.uptime_display(), "0%");

        let metadata = CandidateMetadata {
            country: Some("DE".to_string()),
            anonymity_level: Some("elite".to_string()),
            speed: Some(1.0),
            uptime: Some(99.5),
        };
        assert_eq!(metadata.speed_display(), "1");
        assert_eq!(metadata.uptime_display(), "99.5%");
    }
}

//! GeoNode proxy listing client
//!
//! Fetches candidate proxies, with their advertised metadata, from the
//! paginated GeoNode listing API.

use crate::proxy::models::{Candidate, CandidateMetadata, Protocol, ProxyAddress};
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Default listing endpoint
pub const DEFAULT_BASE_URL: &str = "https://proxylist.geonode.com/api/proxy-list";

/// Default number of entries requested per page
pub const DEFAULT_PAGE_LIMIT: usize = 500;

/// Default timeout for listing requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default pause between page requests in milliseconds
const DEFAULT_PAGE_DELAY_MS: u64 = 1000;

/// Default user agent for listing requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// One page of the listing response
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    data: Vec<ListingEntry>,
}

/// The listing reports ports as strings; accept numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortField {
    Number(u16),
    Text(String),
}

impl PortField {
    fn value(&self) -> Option<u16> {
        match self {
            PortField::Number(port) => Some(*port),
            PortField::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingEntry {
    ip: String,
    port: PortField,
    #[serde(default)]
    protocols: Vec<String>,
    country: Option<String>,
    anonymity_level: Option<String>,
    speed: Option<f64>,
    up_time: Option<f64>,
}

impl ListingEntry {
    fn into_candidate(self) -> Option<Candidate> {
        let Some(port) = self.port.value().filter(|&p| p != 0) else {
            warn!(ip = %self.ip, "skipping listing entry with invalid port");
            return None;
        };

        // Unsupported protocols (socks4/socks5) are dropped, which can leave
        // the set empty; such candidates are reported but never probed.
        let protocols = self
            .protocols
            .iter()
            .filter_map(|name| Protocol::from_name(name))
            .collect();

        let metadata = CandidateMetadata {
            country: self.country,
            anonymity_level: self.anonymity_level,
            speed: self.speed,
            uptime: self.up_time,
        };

        Some(Candidate::new(ProxyAddress::new(self.ip, port), protocols).with_metadata(metadata))
    }
}

/// Parse a listing response body into candidates
pub fn parse_listing(body: &str) -> Result<Vec<Candidate>> {
    let page: ListingPage = serde_json::from_str(body)?;
    Ok(page
        .data
        .into_iter()
        .filter_map(ListingEntry::into_candidate)
        .collect())
}

/// Configuration for the GeoNode client
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNodeConfig {
    pub base_url: String,
    /// Entries requested per page
    pub limit: usize,
    /// Number of pages to fetch, starting at 1
    pub pages: usize,
    /// Pause between page requests
    pub page_delay: Duration,
    /// Timeout for each listing request
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GeoNodeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_PAGE_LIMIT,
            pages: 1,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GeoNodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the GeoNode listing API
pub struct GeoNodeSource {
    config: GeoNodeConfig,
    client: Client,
}

impl GeoNodeSource {
    pub fn with_config(config: GeoNodeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// Fetch one page, newest checked first
    pub async fn fetch_page(&self, page: usize) -> Result<Vec<Candidate>> {
        let body = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("limit", self.config.limit.to_string()),
                ("page", page.to_string()),
                ("sort_by", "lastChecked".to_string()),
                ("sort_type", "desc".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_listing(&body)
    }

    /// Fetch pages `1..=pages`.
    ///
    /// Stops early at the first empty or failed page; a failed page is logged
    /// and the candidates gathered so far are returned.
    pub async fn fetch_all(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for page in 1..=self.config.pages {
            info!(page, "fetching proxy listing page");
            match self.fetch_page(page).await {
                Ok(found) if found.is_empty() => {
                    info!(page, "no more proxies in listing");
                    break;
                }
                Ok(found) => {
                    info!(page, count = found.len(), "fetched proxy listing page");
                    candidates.extend(found);
                }
                Err(e) => {
                    warn!(page, error = %e, "failed to fetch proxy listing page");
                    break;
                }
            }

            if page < self.config.pages && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SAMPLE: &str = r#"{
        "data": [
            {"ip": "1.2.3.4", "port": "8080", "protocols": ["http", "https"],
             "country": "US", "anonymityLevel": "elite", "speed": 1, "upTime": 99.5},
            {"ip": "5.6.7.8", "port": 1080, "protocols": ["socks5"]},
            {"ip": "9.9.9.9", "port": "not-a-port", "protocols": ["http"]}
        ],
        "total": 3
    }"#;

    #[test]
    fn test_geonode_config_default() {
        let config = GeoNodeConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(config.pages, 1);
        assert_eq!(config.page_delay, Duration::from_millis(DEFAULT_PAGE_DELAY_MS));
    }

    #[test]
    fn test_geonode_config_builder() {
        let config = GeoNodeConfig::new()
            .with_base_url("http://localhost/list".to_string())
            .with_limit(50)
            .with_pages(3)
            .with_page_delay(Duration::ZERO)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost/list");
        assert_eq!(config.limit, 50);
        assert_eq!(config.pages, 3);
        assert!(config.page_delay.is_zero());
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_listing() {
        let candidates = parse_listing(SAMPLE).unwrap();
        assert_eq!(candidates.len(), 2);

        let first = &candidates[0];
        assert_eq!(first.address.to_string(), "1.2.3.4:8080");
        assert!(first.claims(Protocol::Http));
        assert!(first.claims(Protocol::Https));
        assert_eq!(first.metadata.country.as_deref(), Some("US"));
        assert_eq!(first.metadata.anonymity_level.as_deref(), Some("elite"));
        assert_eq!(first.metadata.speed, Some(1.0));
        assert_eq!(first.metadata.uptime, Some(99.5));

        let socks = &candidates[1];
        assert!(socks.protocols.is_empty());
        assert_eq!(socks.metadata, CandidateMetadata::default());
    }

    #[test]
    fn test_parse_listing_without_data() {
        assert!(parse_listing(r#"{"total": 0}"#).unwrap().is_empty());
        assert!(parse_listing("not json").is_err());
    }

    /// Serve `SAMPLE` for page 1 and an empty listing for every other page
    async fn fake_listing() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let body = if request.contains("page=1&") {
                        SAMPLE
                    } else {
                        r#"{"data": []}"#
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_all_stops_at_empty_page() {
        let addr = fake_listing().await;
        let source = GeoNodeSource::with_config(
            GeoNodeConfig::new()
                .with_base_url(format!("http://{}/api/proxy-list", addr))
                .with_pages(5)
                .with_page_delay(Duration::ZERO),
        )
        .unwrap();

        let candidates = source.fetch_all().await;
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = GeoNodeSource::with_config(
            GeoNodeConfig::new()
                .with_base_url(format!("http://{}/api/proxy-list", addr))
                .with_pages(3)
                .with_page_delay(Duration::ZERO),
        )
        .unwrap();

        assert!(source.fetch_all().await.is_empty());
    }
}

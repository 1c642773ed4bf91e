//! Liveness probes: one request through a proxy to a known endpoint

use crate::error::ProbeError;
use crate::proxy::models::{ProbeOutcome, Protocol, ProxyAddress};
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default liveness endpoint for HTTP probes
pub const DEFAULT_HTTP_URL: &str = "http://httpbin.org/ip";

/// Default liveness endpoint for HTTPS probes
pub const DEFAULT_HTTPS_URL: &str = "https://httpbin.org/ip";

/// Default user agent sent with probes
pub const DEFAULT_USER_AGENT: &str = concat!("proxy-checker/", env!("CARGO_PKG_VERSION"));

/// A single liveness check of one proxy against one protocol.
///
/// Implementations must fold every failure into the returned outcome. The
/// engine additionally bounds each call by `timeout`, so an implementation
/// that overruns is abandoned and reported as timed out.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self, address: &ProxyAddress, protocol: Protocol, timeout: Duration)
        -> ProbeOutcome;
}

/// Liveness endpoints and request settings for [`HttpProbe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub http_url: String,
    pub https_url: String,
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_url: DEFAULT_HTTP_URL.to_string(),
            https_url: DEFAULT_HTTPS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_url(mut self, url: String) -> Self {
        self.http_url = url;
        self
    }

    pub fn with_https_url(mut self, url: String) -> Self {
        self.https_url = url;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Liveness endpoint matching `protocol`
    pub fn endpoint(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::Http => &self.http_url,
            Protocol::Https => &self.https_url,
        }
    }
}

/// Probe that sends a GET through the proxy with reqwest.
///
/// HTTPS endpoints are reached through a CONNECT tunnel, so TLS is
/// negotiated with the endpoint, not with the proxy.
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    config: ProbeConfig,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Create a reqwest client routed through `address` for `protocol` only
    fn create_client(
        &self,
        address: &ProxyAddress,
        protocol: Protocol,
        timeout: Duration,
    ) -> Result<Client, ProbeError> {
        let proxy_url = address.proxy_url();

        let reqwest_proxy = match protocol {
            Protocol::Http => ReqwestProxy::http(&proxy_url),
            Protocol::Https => ReqwestProxy::https(&proxy_url),
        }
        .map_err(|e| ProbeError::Client(e.to_string()))?;

        Client::builder()
            .proxy(reqwest_proxy)
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(
        &self,
        address: &ProxyAddress,
        protocol: Protocol,
        timeout: Duration,
    ) -> ProbeOutcome {
        let client = match self.create_client(address, protocol, timeout) {
            Ok(client) => client,
            Err(e) => return ProbeOutcome::failed(protocol, e),
        };

        let start = Instant::now();
        let outcome = match tokio::time::timeout(
            timeout,
            client.get(self.config.endpoint(protocol)).send(),
        )
        .await
        {
            Ok(Ok(response)) => {
                if response.status().is_success() {
                    ProbeOutcome::succeeded(protocol, start.elapsed().as_millis() as u64)
                } else {
                    ProbeOutcome::failed(protocol, ProbeError::Status(response.status().as_u16()))
                }
            }
            Ok(Err(e)) => ProbeOutcome::failed(protocol, ProbeError::from_reqwest(e, timeout)),
            Err(_) => ProbeOutcome::failed(protocol, ProbeError::Timeout(timeout)),
        };

        match outcome.elapsed_ms() {
            Some(ms) => debug!(proxy = %address, %protocol, ms, "probe succeeded"),
            None => debug!(
                proxy = %address,
                %protocol,
                error = ?outcome.error(),
                "probe failed"
            ),
        }

        outcome
    }
}

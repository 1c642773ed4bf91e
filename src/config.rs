//! Application configuration
//!
//! Loaded from an optional TOML file; every field has a default, and CLI
//! flags are applied on top by the binary.

use crate::proxy::engine::{DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS, MAX_WORKERS};
use crate::proxy::geonode::{DEFAULT_BASE_URL, DEFAULT_PAGE_LIMIT};
use crate::proxy::probe::{DEFAULT_HTTPS_URL, DEFAULT_HTTP_URL, DEFAULT_USER_AGENT};
use crate::proxy::ranking::DEFAULT_TOP_N;
use crate::proxy::{EngineConfig, GeoNodeConfig, ProbeConfig};
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub checker: CheckerSettings,
    pub geonode: GeoNodeSettings,
    pub output: OutputSettings,
}

/// Validation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerSettings {
    /// Per-probe timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent probes
    pub workers: usize,
    /// Number of fastest proxies to report
    pub top: usize,
    pub http_url: String,
    pub https_url: String,
    pub user_agent: String,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
            top: DEFAULT_TOP_N,
            http_url: DEFAULT_HTTP_URL.to_string(),
            https_url: DEFAULT_HTTPS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// GeoNode listing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoNodeSettings {
    pub base_url: String,
    pub limit: usize,
    pub pages: usize,
    /// Pause between page requests in milliseconds
    pub page_delay_ms: u64,
}

impl Default for GeoNodeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_PAGE_LIMIT,
            pages: 1,
            page_delay_ms: 1000,
        }
    }
}

/// Report file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub results_file: PathBuf,
    pub working_file: PathBuf,
    pub fastest_file: PathBuf,
    pub json_file: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            results_file: PathBuf::from("proxy_results.txt"),
            working_file: PathBuf::from("working_proxies.txt"),
            fastest_file: PathBuf::from("fastest_proxies.txt"),
            json_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the engine and sources cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.checker.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.checker.workers > MAX_WORKERS {
            bail!("workers must be at most {}", MAX_WORKERS);
        }
        if self.checker.timeout_secs == 0 {
            bail!("timeout must be greater than 0 seconds");
        }
        if self.checker.top == 0 {
            bail!("top must be at least 1");
        }
        if self.geonode.pages == 0 {
            bail!("pages must be at least 1");
        }
        if self.geonode.limit == 0 {
            bail!("geonode limit must be at least 1");
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_workers(self.checker.workers)
            .with_timeout(Duration::from_secs(self.checker.timeout_secs))
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new()
            .with_http_url(self.checker.http_url.clone())
            .with_https_url(self.checker.https_url.clone())
            .with_user_agent(self.checker.user_agent.clone())
    }

    pub fn geonode_config(&self) -> GeoNodeConfig {
        GeoNodeConfig::new()
            .with_base_url(self.geonode.base_url.clone())
            .with_limit(self.geonode.limit)
            .with_pages(self.geonode.pages)
            .with_page_delay(Duration::from_millis(self.geonode.page_delay_ms))
    }
}

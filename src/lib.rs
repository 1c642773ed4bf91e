//! Proxy Checker - fetch, validate and rank HTTP/HTTPS proxies
//!
//! Candidates are probed for HTTP and HTTPS forwarding through a shared,
//! fixed-size worker pool. Working proxies are ranked by latency.

pub mod config;
pub mod error;
pub mod proxy;
pub mod report;
pub mod tui;

pub use config::AppConfig;
pub use error::{EngineError, ProbeError};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_logger(default_level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

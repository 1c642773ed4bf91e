//! Error types for probes and the validation engine

use crate::proxy::models::ValidationResult;
use std::error::Error as StdError;
use std::time::Duration;

/// Why a single probe failed. Rendered into a result's error detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("unexpected HTTP status: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ProbeError {
    /// Classify a reqwest error. `timeout` is the budget the request ran under.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout(timeout)
        } else if let Some(status) = err.status() {
            ProbeError::Status(status.as_u16())
        } else if err.is_connect() {
            ProbeError::Connect(error_chain(&err))
        } else if err.is_builder() {
            ProbeError::Client(error_chain(&err))
        } else {
            ProbeError::Request(error_chain(&err))
        }
    }
}

/// Join an error and its sources with `: `
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Faults that abort a validation run
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("worker pool closed")]
    PoolClosed,
    /// The consumer stopped the run before every candidate was reported
    #[error("validation cancelled")]
    Cancelled,
    #[error("probe task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
    /// Raised by collecting entry points; `completed` holds every result
    /// finalized before the fault.
    #[error("validation aborted after {} results: {source}", .completed.len())]
    Aborted {
        completed: Vec<ValidationResult>,
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn aborted(completed: Vec<ValidationResult>, source: EngineError) -> Self {
        EngineError::Aborted {
            completed,
            source: Box::new(source),
        }
    }

    /// Results finalized before the fault, if any were carried
    pub fn partial_results(&self) -> &[ValidationResult] {
        match self {
            EngineError::Aborted { completed, .. } => completed,
            _ => &[],
        }
    }
}

//! Concurrent validation engine
//!
//! Runs one probe per claimed protocol for every candidate over a shared,
//! fixed-size worker pool and joins each candidate's probes into a single
//! [`ValidationResult`].
//!
//! Results are produced in **completion order**, not submission order. A
//! caller that needs input order must re-sort, e.g. by address.

use crate::error::{EngineError, ProbeError};
use crate::proxy::models::{Candidate, ProbeOutcome, ValidationResult};
use crate::proxy::probe::{HttpProbe, Probe, ProbeConfig};
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info};

/// Default timeout for each probe in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent probes
pub const DEFAULT_WORKERS: usize = 10;

/// Largest pool the engine will build; larger worker counts are clamped
pub const MAX_WORKERS: usize = Semaphore::MAX_PERMITS;

/// Upper bound on results buffered between `spawn_validation` and its receiver
const MAX_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for the validation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Timeout for each probe
    pub timeout: Duration,
    /// Maximum number of probes running at once, across all candidates
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clamped to `1..=MAX_WORKERS`
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }
}

/// Progress snapshot reported after each result is finalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub working: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: &ValidationResult) {
        self.completed += 1;
        if result.is_working() {
            self.working += 1;
        }
    }

    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            return 100;
        }
        (self.completed as f64 / self.total as f64 * 100.0) as u16
    }
}

/// Validates candidates with bounded concurrency.
///
/// The worker pool belongs to the engine, so concurrent runs on clones of
/// the same engine share one concurrency budget.
pub struct ValidationEngine<P: Probe = HttpProbe> {
    config: EngineConfig,
    probe: Arc<P>,
    pool: Arc<Semaphore>,
}

impl ValidationEngine<HttpProbe> {
    /// Create an engine using [`HttpProbe`] with default endpoints
    pub fn new(config: EngineConfig) -> Self {
        Self::with_probe(config, HttpProbe::new())
    }

    /// Create an engine using [`HttpProbe`] with custom endpoints
    pub fn with_probe_config(config: EngineConfig, probe_config: ProbeConfig) -> Self {
        Self::with_probe(config, HttpProbe::with_config(probe_config))
    }
}

impl<P: Probe> ValidationEngine<P> {
    pub fn with_probe(config: EngineConfig, probe: P) -> Self {
        let workers = config.workers.clamp(1, MAX_WORKERS);
        Self {
            config: EngineConfig { workers, ..config },
            probe: Arc::new(probe),
            pool: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Close the worker pool. Runs in progress fail with [`EngineError::PoolClosed`]
    /// as soon as they try to schedule another probe.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Stream results in completion order.
    ///
    /// The stream yields one item per candidate. An `Err` item is an engine
    /// fault; items after it are not meaningful and callers should stop.
    pub fn results(
        &self,
        candidates: Vec<Candidate>,
    ) -> impl Stream<Item = Result<ValidationResult, EngineError>> + '_ {
        stream::iter(candidates)
            .map(move |candidate| self.validate_candidate(candidate))
            .buffer_unordered(self.config.workers)
    }

    /// Validate all candidates and collect the results in completion order.
    pub async fn validate(
        &self,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<ValidationResult>, EngineError> {
        self.validate_with_progress(candidates, |_| {}).await
    }

    /// Like [`validate`](Self::validate), calling `on_progress` after every
    /// finalized result.
    ///
    /// On a fault the returned [`EngineError::Aborted`] carries the results
    /// finalized so far.
    pub async fn validate_with_progress<F>(
        &self,
        candidates: Vec<Candidate>,
        mut on_progress: F,
    ) -> Result<Vec<ValidationResult>, EngineError>
    where
        F: FnMut(Progress),
    {
        let mut progress = Progress::new(candidates.len());
        let mut results = Vec::with_capacity(progress.total);

        info!(
            candidates = progress.total,
            workers = self.config.workers,
            timeout_secs = self.config.timeout.as_secs_f64(),
            "validating proxies"
        );

        let stream = self.results(candidates);
        futures::pin_mut!(stream);

        while let Some(item) = stream.next().await {
            match item {
                Ok(result) => {
                    progress.record(&result);
                    results.push(result);
                    on_progress(progress);
                }
                Err(e) => {
                    error!(completed = results.len(), error = %e, "validation aborted");
                    return Err(EngineError::aborted(results, e));
                }
            }
        }

        info!(
            checked = progress.completed,
            working = progress.working,
            "validation finished"
        );
        Ok(results)
    }

    /// Run validation on a background task and receive results over a channel.
    ///
    /// The channel closes once every candidate has been reported, after the
    /// first fault, or when the receiver is dropped.
    pub fn spawn_validation(
        &self,
        candidates: Vec<Candidate>,
    ) -> mpsc::Receiver<Result<ValidationResult, EngineError>> {
        let capacity = self.config.workers.saturating_mul(2).min(MAX_CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::channel(capacity);
        let engine = self.clone();

        tokio::spawn(async move {
            let stream = engine.results(candidates);
            futures::pin_mut!(stream);

            while let Some(item) = stream.next().await {
                let fault = item.is_err();
                if tx.send(item).await.is_err() || fault {
                    break;
                }
            }
        });

        rx
    }

    /// Probe every claimed protocol of one candidate and join the outcomes
    async fn validate_candidate(
        &self,
        candidate: Candidate,
    ) -> Result<ValidationResult, EngineError> {
        let mut handles = Vec::with_capacity(candidate.protocols.len());

        for &protocol in &candidate.protocols {
            let permit = Arc::clone(&self.pool)
                .acquire_owned()
                .await
                .map_err(|_| EngineError::PoolClosed)?;
            let probe = Arc::clone(&self.probe);
            let address = candidate.address.clone();
            let timeout = self.config.timeout;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                match tokio::time::timeout(timeout, probe.probe(&address, protocol, timeout)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => ProbeOutcome::failed(protocol, ProbeError::Timeout(timeout)),
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await?);
        }

        let result = ValidationResult::reconcile(candidate, outcomes);
        debug!(
            proxy = %result.address,
            http = result.http_ok,
            https = result.https_ok,
            latency_ms = ?result.latency_ms,
            "candidate validated"
        );
        Ok(result)
    }
}

impl<P: Probe> Clone for ValidationEngine<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            probe: Arc::clone(&self.probe),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl Default for ValidationEngine<HttpProbe> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

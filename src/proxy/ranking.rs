//! Summary counts and latency ranking over validation results

use crate::proxy::models::ValidationResult;
use serde::Serialize;
use std::cmp::Ordering;

/// Default number of fastest proxies to report
pub const DEFAULT_TOP_N: usize = 10;

/// Aggregate counts over a result collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_checked: usize,
    pub working: usize,
    pub http_working: usize,
    pub https_working: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let total_checked = results.len();
        let working = results.iter().filter(|r| r.is_working()).count();

        Self {
            total_checked,
            working,
            http_working: results.iter().filter(|r| r.http_ok).count(),
            https_working: results.iter().filter(|r| r.https_ok).count(),
            failed: total_checked - working,
        }
    }
}

/// Working results sorted by ascending latency.
///
/// Results without a latency sort last. The sort is stable, so ties keep
/// the order of `results`.
pub fn rank_by_latency(results: &[ValidationResult]) -> Vec<&ValidationResult> {
    let mut working: Vec<_> = results.iter().filter(|r| r.is_working()).collect();
    working.sort_by(|a, b| compare_latency(a.latency_ms, b.latency_ms));
    working
}

/// The `n` fastest working results
pub fn fastest(results: &[ValidationResult], n: usize) -> Vec<&ValidationResult> {
    let mut ranked = rank_by_latency(results);
    ranked.truncate(n);
    ranked
}

fn compare_latency(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

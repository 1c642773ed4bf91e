//! Proxy validation module
//!
//! This module provides functionality for:
//! - Loading candidates from proxy list files and the GeoNode listing API
//! - Probing candidates for HTTP and HTTPS forwarding with bounded concurrency
//! - Ranking working proxies by latency

pub mod engine;
pub mod geo;
pub mod geonode;
pub mod models;
pub mod parser;
pub mod probe;
pub mod ranking;

pub use engine::{EngineConfig, Progress, ValidationEngine};
pub use geo::{GeoLocation, GeoLocator};
pub use geonode::{GeoNodeConfig, GeoNodeSource};
pub use models::{
    all_protocols, Candidate, CandidateMetadata, ProbeOutcome, ProbeStatus, Protocol,
    ProxyAddress, ValidationResult,
};
pub use parser::ProxyParser;
pub use probe::{HttpProbe, Probe, ProbeConfig};
pub use ranking::{fastest, rank_by_latency, Summary};

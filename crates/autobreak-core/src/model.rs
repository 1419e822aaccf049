//! Node, sample, and cycle type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::{AutobreakError, AutobreakResult};

/// Latency substituted for a failed probe, in milliseconds
pub const PENALTY_LATENCY_MS: f64 = 10_000.0;

/// A node that can be selected as the active upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Node address or URL, unique within a configuration
    pub address: String,
    /// Last known representative latency in milliseconds
    #[serde(default)]
    pub latency: Option<f64>,
}

impl NodeSpec {
    /// Create a node with no known latency
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latency: None,
        }
    }

    /// Set the last known latency
    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = Some(latency);
        self
    }
}

/// Reject a node list that names the same address twice
///
/// Latencies are keyed by address, so a repeated node would be sampled twice
/// and collapse into one map entry.
pub fn check_unique_addresses(nodes: &[NodeSpec]) -> AutobreakResult<()> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.address.as_str()) {
            return Err(AutobreakError::InvalidArgument(format!(
                "duplicate node address: {}",
                node.address
            )));
        }
    }
    Ok(())
}

/// Result of a single probe against a node
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Measured round-trip latency in milliseconds
    Success(f64),
    /// The probe failed; the reason is informational only
    Failure(String),
}

impl ProbeOutcome {
    /// Create a failure outcome
    pub fn failure(reason: impl Into<String>) -> Self {
        ProbeOutcome::Failure(reason.into())
    }

    /// Get the measured latency, if any
    pub fn latency(&self) -> Option<f64> {
        match self {
            ProbeOutcome::Success(ms) => Some(*ms),
            ProbeOutcome::Failure(_) => None,
        }
    }

    /// Check if the probe succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    /// Get the sample value for this outcome, penalizing failures
    pub fn sample_value(&self) -> f64 {
        self.latency().unwrap_or(PENALTY_LATENCY_MS)
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Success(ms) => write!(f, "{:.3}ms", ms),
            ProbeOutcome::Failure(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Ordered samples collected for one node within one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    samples: Vec<f64>,
}

impl SampleSet {
    /// Build a sample set, rejecting empty input
    pub fn new(samples: Vec<f64>) -> AutobreakResult<Self> {
        if samples.is_empty() {
            return Err(AutobreakError::InvalidArgument(
                "sample set must contain at least one sample".to_string(),
            ));
        }
        Ok(Self { samples })
    }

    /// Get the samples in collection order
    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; a sample set holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples that are the failure penalty
    pub fn failures(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| **s == PENALTY_LATENCY_MS)
            .count()
    }
}

/// Representative latency per node address for one cycle
///
/// Keys iterate in address order, which the selector relies on for its
/// tie-break.
pub type LatencyMap = BTreeMap<String, f64>;

/// The node chosen by a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Address of the chosen node
    pub address: String,
    /// Its representative latency in milliseconds
    pub latency: f64,
}

/// What happened to the system proxy at the end of a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProxyOutcome {
    /// No proxy is configured
    Disabled,
    /// The proxy already pointed at the target
    Unchanged { target: String },
    /// The proxy was rewritten
    Changed {
        previous: Option<String>,
        target: String,
    },
    /// Reading or writing the proxy setting failed; retried next cycle
    Failed { target: String, error: String },
}

impl std::fmt::Display for ProxyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyOutcome::Disabled => write!(f, "disabled"),
            ProxyOutcome::Unchanged { .. } => write!(f, "unchanged"),
            ProxyOutcome::Changed { .. } => write!(f, "changed"),
            ProxyOutcome::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Summary of one evaluate, select, apply pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Unique cycle identifier
    pub id: Uuid,
    /// When evaluation started
    pub started_at: DateTime<Utc>,
    /// When the cycle completed
    pub finished_at: DateTime<Utc>,
    /// Representative latency per node
    pub latencies: LatencyMap,
    /// Chosen node
    pub selection: Selection,
    /// Proxy apply result
    pub proxy: ProxyOutcome,
}

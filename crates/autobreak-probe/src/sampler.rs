//! Per-node latency sampling

use autobreak_core::{AutobreakError, AutobreakResult, ProbeOutcome, SampleSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::traits::Prober;

/// Collects a fixed number of latency samples for a node
///
/// Failed probes are recorded as [`autobreak_core::PENALTY_LATENCY_MS`], so
/// a sample set always holds exactly `repeat` entries.
pub struct Sampler {
    prober: Arc<dyn Prober>,
    /// Probes per sample set
    repeat: u32,
    /// Echo attempts per probe
    attempts: u32,
    /// Delay before each probe
    interval: Duration,
}

impl Sampler {
    /// Create a new sampler
    pub fn new(
        prober: Arc<dyn Prober>,
        repeat: u32,
        attempts: u32,
        interval: Duration,
    ) -> AutobreakResult<Self> {
        if repeat < 1 {
            return Err(AutobreakError::InvalidArgument(format!(
                "repeat must be at least 1, got {}",
                repeat
            )));
        }
        if attempts < 1 {
            return Err(AutobreakError::InvalidArgument(format!(
                "attempts must be at least 1, got {}",
                attempts
            )));
        }

        Ok(Self {
            prober,
            repeat,
            attempts,
            interval,
        })
    }

    /// Get the number of probes per sample set
    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    /// Probe `address` `repeat` times, spacing probes by the interval
    pub async fn sample(&self, address: &str) -> AutobreakResult<SampleSet> {
        let mut samples = Vec::with_capacity(self.repeat as usize);

        for probe in 1..=self.repeat {
            if !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }

            let outcome = self.prober.probe(address, self.attempts).await;
            match &outcome {
                ProbeOutcome::Success(ms) => {
                    info!(address = %address, probe, latency_ms = ms, "Probe succeeded");
                }
                ProbeOutcome::Failure(reason) => {
                    warn!(
                        address = %address,
                        probe,
                        reason = %reason,
                        latency_ms = outcome.sample_value(),
                        "Probe failed, recording penalty"
                    );
                }
            }
            samples.push(outcome.sample_value());
        }

        SampleSet::new(samples)
    }
}

//! HTTP latency probing

use async_trait::async_trait;
use autobreak_core::{AutobreakError, AutobreakResult, ProbeOutcome};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::traits::Prober;

/// Prober timing HTTP GET requests against a node
pub struct HttpProber {
    /// HTTP client for probes
    client: reqwest::Client,
    /// Timeout duration
    timeout: Duration,
}

impl HttpProber {
    /// Create a new HTTP prober
    pub fn new(timeout: Duration) -> AutobreakResult<Self> {
        // Probes go direct; the system proxy is what gets switched
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| AutobreakError::Probe(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time a single request, in milliseconds
    async fn attempt(&self, url: &str) -> Result<f64, String> {
        let start = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                Ok(start.elapsed().as_secs_f64() * 1000.0)
            }
            Ok(response) => Err(format!("status {}", response.status())),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Nodes configured as bare hosts are probed over plain HTTP
fn probe_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, address: &str, attempts: u32) -> ProbeOutcome {
        let url = probe_url(address);
        let mut total = 0.0;
        let mut succeeded = 0u32;
        let mut last_error = None;

        for _ in 0..attempts {
            match self.attempt(&url).await {
                Ok(ms) => {
                    debug!(endpoint = %url, latency_ms = ms, "HTTP probe attempt passed");
                    total += ms;
                    succeeded += 1;
                }
                Err(e) => {
                    warn!(endpoint = %url, error = %e, "HTTP probe attempt failed");
                    last_error = Some(e);
                }
            }
        }

        if succeeded == 0 {
            return ProbeOutcome::failure(last_error.unwrap_or_else(|| "no attempts".to_string()));
        }
        ProbeOutcome::Success(total / succeeded as f64)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

//! Prober trait definitions

use async_trait::async_trait;
use autobreak_core::{AutobreakResult, ProbeConfig, ProbeMethod, ProbeOutcome};
use std::sync::Arc;

use crate::{HttpProber, PingProber};

/// Measures round-trip latency to a node
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `address` with `attempts` underlying echo attempts
    ///
    /// Every failure cause collapses into [`ProbeOutcome::Failure`].
    async fn probe(&self, address: &str, attempts: u32) -> ProbeOutcome;

    /// Get the prober name
    fn name(&self) -> &'static str;
}

/// Build the prober selected by the configuration
pub fn build_prober(config: &ProbeConfig) -> AutobreakResult<Arc<dyn Prober>> {
    let prober: Arc<dyn Prober> = match config.method {
        ProbeMethod::Icmp => Arc::new(PingProber::new(config.timeout())),
        ProbeMethod::Http => Arc::new(HttpProber::new(config.timeout())?),
    };
    Ok(prober)
}

//! One evaluation cycle

use autobreak_core::{
    check_unique_addresses, AutobreakConfig, AutobreakError, AutobreakResult, CycleReport,
    LatencyMap, NodeSpec, ProxyOutcome,
};
use autobreak_probe::{build_prober, select, NodeEvaluator, Prober, Sampler};
use autobreak_proxy::ProxySwitch;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Evaluates every node, picks the fastest and points the proxy at it
pub struct Pipeline {
    /// Configured nodes with their last-known latency
    nodes: RwLock<Vec<NodeSpec>>,
    /// Node evaluator
    evaluator: NodeEvaluator,
    /// Proxy switch, absent when no proxy is configured
    proxy: Option<ProxySwitch>,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(
        nodes: Vec<NodeSpec>,
        evaluator: NodeEvaluator,
        proxy: Option<ProxySwitch>,
    ) -> AutobreakResult<Self> {
        if nodes.is_empty() {
            return Err(AutobreakError::InvalidArgument(
                "pipeline needs at least one node".to_string(),
            ));
        }
        check_unique_addresses(&nodes)?;

        info!(
            nodes = nodes.len(),
            statistic = %evaluator.statistic(),
            proxy = proxy.is_some(),
            "Pipeline initialized"
        );

        Ok(Self {
            nodes: RwLock::new(nodes),
            evaluator,
            proxy,
        })
    }

    /// Build the pipeline described by the configuration
    pub fn from_config(config: &AutobreakConfig) -> AutobreakResult<Self> {
        let prober = build_prober(&config.probe)?;
        Self::with_prober(config, prober)
    }

    /// Build the pipeline with a specific prober
    pub fn with_prober(config: &AutobreakConfig, prober: Arc<dyn Prober>) -> AutobreakResult<Self> {
        debug!(prober = prober.name(), "Building pipeline");

        let sampler = Sampler::new(
            prober,
            config.repeat,
            config.probe.attempts,
            config.probe.interval(),
        )?;
        let evaluator = NodeEvaluator::new(sampler, config.statistic)?;
        let proxy = config
            .proxy
            .as_ref()
            .map(ProxySwitch::from_config)
            .transpose()?;

        Self::new(config.node_specs(), evaluator, proxy)
    }

    /// Get a snapshot of the nodes and their last-known latency
    pub async fn nodes(&self) -> Vec<NodeSpec> {
        self.nodes.read().await.clone()
    }

    /// Run one evaluate, select, apply pass
    pub async fn run_cycle(&self) -> AutobreakResult<CycleReport> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let nodes = self.nodes().await;

        info!(cycle_id = %id, nodes = nodes.len(), "Starting cycle");

        let latencies = self.evaluator.evaluate(&nodes).await?;
        let selection = select(&latencies)?;
        self.record_latencies(&latencies).await;

        info!(
            cycle_id = %id,
            selected = %selection.address,
            latency_ms = selection.latency,
            "Selected fastest node"
        );

        let proxy = match &self.proxy {
            Some(switch) => switch.switch_to(&selection.address).await,
            None => ProxyOutcome::Disabled,
        };

        Ok(CycleReport {
            id,
            started_at,
            finished_at: Utc::now(),
            latencies,
            selection,
            proxy,
        })
    }

    /// Overwrite each node's last-known latency with this cycle's value
    async fn record_latencies(&self, latencies: &LatencyMap) {
        let mut nodes = self.nodes.write().await;
        for node in nodes.iter_mut() {
            node.latency = latencies.get(&node.address).copied();
        }
    }
}

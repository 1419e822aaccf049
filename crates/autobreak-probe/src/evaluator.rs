//! Concurrent evaluation of all configured nodes

use autobreak_core::{
    check_unique_addresses, AutobreakError, AutobreakResult, LatencyMap, NodeSpec, Statistic,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::sampler::Sampler;

/// Samples every node concurrently and reduces each to one latency
pub struct NodeEvaluator {
    sampler: Arc<Sampler>,
    statistic: Statistic,
}

impl NodeEvaluator {
    /// Create a new evaluator
    pub fn new(sampler: Sampler, statistic: Statistic) -> AutobreakResult<Self> {
        statistic.validate()?;
        Ok(Self {
            sampler: Arc::new(sampler),
            statistic,
        })
    }

    /// Get the aggregation statistic
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// Evaluate all nodes and build a fresh latency map
    ///
    /// One task runs per node. Each returns its `(address, latency)` pair and
    /// the map is filled here once every task has finished, so the map is
    /// only ever written from this task. Probe failures are already folded
    /// into the samples; only a panicked node task makes this fail.
    pub async fn evaluate(&self, nodes: &[NodeSpec]) -> AutobreakResult<LatencyMap> {
        if nodes.is_empty() {
            return Err(AutobreakError::InvalidArgument(
                "no nodes to evaluate".to_string(),
            ));
        }
        check_unique_addresses(nodes)?;

        let mut tasks = JoinSet::new();
        for node in nodes {
            let sampler = self.sampler.clone();
            let statistic = self.statistic;
            let address = node.address.clone();

            tasks.spawn(async move {
                let samples = sampler.sample(&address).await?;
                let latency = statistic.apply(&samples)?;
                debug!(
                    address = %address,
                    statistic = %statistic,
                    failures = samples.failures(),
                    latency_ms = latency,
                    "Node evaluated"
                );
                Ok::<_, AutobreakError>((address, latency))
            });
        }

        let mut latencies = LatencyMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (address, latency) = joined.map_err(|e| {
                AutobreakError::Internal(format!("node evaluation task failed: {}", e))
            })??;
            latencies.insert(address, latency);
        }

        info!(nodes = latencies.len(), "Evaluation complete");
        Ok(latencies)
    }
}

//! Fixed-period cycle driver
//!
//! Each timer tick launches a cycle as its own task. At most one cycle is in
//! flight: a tick that fires while the previous cycle is still running is
//! skipped, so proxy writes from successive cycles never race.
//!
//! ## Usage
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let handle = Driver::new(pipeline, period).start(shutdown_rx);
//! // ... later ...
//! shutdown_tx.send(true)?;
//! let stats = handle.await?;
//! ```

use autobreak_core::{AutobreakResult, CycleReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::pipeline::Pipeline;

/// Counters for a driver run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Cycles that completed
    pub completed: u64,
    /// Cycles that returned an error or panicked
    pub failed: u64,
    /// Ticks skipped because a cycle was in flight
    pub skipped: u64,
}

/// Re-runs the pipeline on a fixed period until shut down
pub struct Driver {
    pipeline: Arc<Pipeline>,
    /// Time between cycle starts
    period: Duration,
}

impl Driver {
    /// Create a new driver
    pub fn new(pipeline: Arc<Pipeline>, period: Duration) -> Self {
        Self { pipeline, period }
    }

    /// Get the period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run exactly one cycle
    pub async fn run_once(&self) -> AutobreakResult<CycleReport> {
        self.pipeline.run_cycle().await
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped
    ///
    /// The first cycle starts immediately. A cycle in flight at shutdown is
    /// awaited before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> DriverStats {
        info!(period_secs = self.period.as_secs_f64(), "Starting cycle driver");

        let mut stats = DriverStats::default();
        // interval() rejects a zero period
        let mut ticker = interval(self.period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles: JoinSet<AutobreakResult<CycleReport>> = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, stopping cycle driver");
                        break;
                    }
                }
                Some(finished) = cycles.join_next(), if !cycles.is_empty() => {
                    record(&mut stats, finished);
                }
                _ = ticker.tick() => {
                    if cycles.is_empty() {
                        let pipeline = self.pipeline.clone();
                        cycles.spawn(async move { pipeline.run_cycle().await });
                    } else {
                        stats.skipped += 1;
                        warn!("Previous cycle still running, skipping tick");
                    }
                }
            }
        }

        while let Some(finished) = cycles.join_next().await {
            record(&mut stats, finished);
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            "Cycle driver stopped"
        );
        stats
    }

    /// Start the driver as a background task
    pub fn start(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<DriverStats> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

fn record(stats: &mut DriverStats, finished: Result<AutobreakResult<CycleReport>, JoinError>) {
    match finished {
        Ok(Ok(report)) => {
            stats.completed += 1;
            info!(
                cycle_id = %report.id,
                selected = %report.selection.address,
                latency_ms = report.selection.latency,
                proxy = %report.proxy,
                "Cycle complete"
            );
        }
        Ok(Err(e)) => {
            stats.failed += 1;
            error!(error = %e, "Cycle failed");
        }
        Err(e) => {
            stats.failed += 1;
            error!(error = %e, "Cycle task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autobreak_core::{ProbeOutcome, Statistic};
    use autobreak_probe::{NodeEvaluator, Prober, Sampler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sleeps for a fixed time and tracks the highest probe concurrency
    struct SlowProber {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl SlowProber {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Prober for SlowProber {
        async fn probe(&self, _address: &str, _attempts: u32) -> ProbeOutcome {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            ProbeOutcome::Success(1.0)
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn pipeline(prober: Arc<SlowProber>) -> Arc<Pipeline> {
        let sampler = Sampler::new(prober, 1, 1, Duration::ZERO).unwrap();
        let evaluator = NodeEvaluator::new(sampler, Statistic::Mean).unwrap();
        let nodes = vec![autobreak_core::NodeSpec::new("n1")];
        Arc::new(Pipeline::new(nodes, evaluator, None).unwrap())
    }

    #[tokio::test]
    async fn test_run_once() {
        let driver = Driver::new(pipeline(SlowProber::new(Duration::ZERO)), Duration::from_secs(120));
        let report = driver.run_once().await.unwrap();
        assert_eq!(report.selection.address, "n1");
        assert_eq!(driver.period(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_repeats_cycles_until_shutdown() {
        let prober = SlowProber::new(Duration::ZERO);
        let driver = Driver::new(pipeline(prober.clone()), Duration::from_millis(20));
        let (tx, rx) = watch::channel(false);

        let handle = driver.start(rx);
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();

        let stats = handle.await.unwrap();
        assert!(stats.completed >= 3, "only {} cycles", stats.completed);
        assert_eq!(stats.failed, 0);
        assert_eq!(prober.calls.load(Ordering::SeqCst) as u64, stats.completed);
    }

    #[tokio::test]
    async fn test_skips_ticks_while_cycle_in_flight() {
        let prober = SlowProber::new(Duration::from_millis(120));
        let driver = Driver::new(pipeline(prober.clone()), Duration::from_millis(20));
        let (tx, rx) = watch::channel(false);

        let handle = driver.start(rx);
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(true).unwrap();

        let stats = handle.await.unwrap();
        assert!(stats.skipped > 0);
        assert!(stats.completed >= 1);
        assert_eq!(prober.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stops_when_sender_dropped() {
        let driver = Driver::new(pipeline(SlowProber::new(Duration::ZERO)), Duration::from_secs(3600));
        let (tx, rx) = watch::channel(false);

        let handle = driver.start(rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats.completed, 1);
    }
}

//! autobreak daemon
//!
//! Periodically measures latency to the configured nodes and points the
//! system proxy at the fastest one.

use anyhow::Context;
use autobreak_core::{AutobreakConfig, LoggingConfig, ProxyOutcome};
use autobreak_scheduler::{Driver, Pipeline};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// autobreakd - switch the system proxy to the lowest-latency node
#[derive(Parser, Debug)]
#[command(name = "autobreakd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single cycle, print the chosen node and exit
    #[arg(long)]
    once: bool,

    /// Log level, overriding the configuration file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AutobreakConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    init_logging(&config.logging, args.log_level.as_deref())?;

    info!("Starting autobreak daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config = %args.config.display(),
        nodes = config.nodes.len(),
        repeat = config.repeat,
        "Configuration loaded"
    );

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let driver = Driver::new(pipeline, config.schedule.period());

    if args.once {
        let report = driver.run_once().await?;
        println!(
            "{} with min latency {:.3}ms",
            report.selection.address, report.selection.latency
        );
        if let ProxyOutcome::Failed { error, .. } = &report.proxy {
            anyhow::bail!("Failed to apply proxy: {}", error);
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = driver.start(shutdown_rx);

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    let stats = handle.await.context("Cycle driver task failed")?;
    info!(
        completed = stats.completed,
        failed = stats.failed,
        skipped = stats.skipped,
        "autobreak daemon stopped"
    );

    Ok(())
}

/// Install the global subscriber; `RUST_LOG` takes precedence over both
/// the flag and the configuration file
fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) -> anyhow::Result<()> {
    let level = level_override.unwrap_or(&logging.level).to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .with_context(|| format!("Invalid log level: {}", level))?;

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to set subscriber")?;
        }
    }

    Ok(())
}

/// Wait for Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

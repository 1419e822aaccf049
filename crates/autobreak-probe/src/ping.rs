//! ICMP probing through the system `ping` command
//!
//! Raw ICMP sockets need elevated privileges, so the probe shells out to the
//! platform `ping` binary and parses its summary.

use async_trait::async_trait;
use autobreak_core::ProbeOutcome;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::traits::Prober;

/// Prober backed by the system `ping` command
pub struct PingProber {
    /// Path to the ping binary
    ping_path: PathBuf,
    /// Per-echo timeout
    timeout: Duration,
}

impl PingProber {
    /// Create a new ping prober
    pub fn new(timeout: Duration) -> Self {
        Self {
            ping_path: PathBuf::from("ping"),
            timeout,
        }
    }

    /// Use a specific ping binary
    pub fn with_ping_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ping_path = path.into();
        self
    }

    /// Build the ping command
    fn build_command(&self, address: &str, attempts: u32) -> Command {
        let mut cmd = Command::new(&self.ping_path);

        cmd.arg("-n").arg("-c").arg(attempts.to_string());

        // macOS takes the reply wait in milliseconds, Linux in seconds
        if cfg!(target_os = "macos") {
            cmd.arg("-W").arg(self.timeout.as_millis().to_string());
        } else {
            cmd.arg("-W").arg(self.timeout.as_secs().max(1).to_string());
        }

        cmd.arg(address);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        cmd
    }

    /// Upper bound on a whole ping invocation
    fn deadline(&self, attempts: u32) -> Duration {
        // ping spaces echoes one second apart
        self.timeout + Duration::from_secs(attempts as u64)
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: &str, attempts: u32) -> ProbeOutcome {
        let mut cmd = self.build_command(address, attempts);

        let output = match tokio::time::timeout(self.deadline(attempts), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ProbeOutcome::failure(format!("failed to run ping: {}", e)),
            Err(_) => return ProbeOutcome::failure("ping timed out"),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(
                address = %address,
                status = %output.status,
                stderr = %stderr.trim(),
                "ping exited unsuccessfully"
            );
            return ProbeOutcome::failure(format!("ping exited with {}", output.status));
        }

        match parse_ping_output(&stdout) {
            Some(ms) => ProbeOutcome::Success(ms),
            None => ProbeOutcome::failure("no round-trip time in ping output"),
        }
    }

    fn name(&self) -> &'static str {
        "icmp"
    }
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Extract the average round-trip time in milliseconds from ping output
///
/// Prefers the `min/avg/max` summary line and falls back to averaging the
/// individual `time=` replies.
pub fn parse_ping_output(output: &str) -> Option<f64> {
    parse_summary(output).or_else(|| parse_replies(output))
}

/// Linux: "rtt min/avg/max/mdev = 0.045/0.056/0.071/0.010 ms"
/// macOS: "round-trip min/avg/max/stddev = 14.1/15.2/16.3/0.9 ms"
fn parse_summary(output: &str) -> Option<f64> {
    let line = output.lines().find(|l| l.contains("min/avg/max"))?;
    let (_, values) = line.split_once('=')?;
    values.trim().split('/').nth(1)?.trim().parse().ok()
}

fn parse_replies(output: &str) -> Option<f64> {
    let times: Vec<f64> = output
        .lines()
        .filter_map(|line| {
            let start = line.find("time=")?;
            let rest = &line[start + 5..];
            let end = rest
                .find(|c: char| c != '.' && !c.is_ascii_digit())
                .unwrap_or(rest.len());
            rest[..end].parse().ok()
        })
        .collect();

    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<f64>() / times.len() as f64)
}

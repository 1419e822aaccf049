//! Command-driven proxy applier
//!
//! Runs operator-supplied commands to read and write the proxy setting, so
//! any platform tool (`gsettings`, `networksetup`, `netsh`) can be plugged in
//! from configuration.

use async_trait::async_trait;
use autobreak_core::{AutobreakError, AutobreakResult, ProxyConfig, TARGET_PLACEHOLDER};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::traits::ProxyApplier;

/// Default limit on a single proxy command
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Proxy applier running external commands
#[derive(Debug, Clone)]
pub struct CommandProxy {
    /// Program and arguments printing the current target
    query_command: Vec<String>,
    /// Program and arguments setting the target
    set_command: Vec<String>,
    /// Limit on each command
    timeout: Duration,
}

impl CommandProxy {
    /// Create a new command proxy
    pub fn new(query_command: Vec<String>, set_command: Vec<String>) -> AutobreakResult<Self> {
        if query_command.is_empty() || set_command.is_empty() {
            return Err(AutobreakError::InvalidArgument(
                "proxy commands must not be empty".to_string(),
            ));
        }
        Ok(Self {
            query_command,
            set_command,
            timeout: COMMAND_TIMEOUT,
        })
    }

    /// Create a command proxy from configuration
    pub fn from_config(config: &ProxyConfig) -> AutobreakResult<Self> {
        Self::new(config.query_command.clone(), config.set_command.clone())
    }

    /// Set the per-command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the set command with the target substituted
    fn set_args(&self, target: &str) -> Vec<String> {
        self.set_command
            .iter()
            .map(|arg| arg.replace(TARGET_PLACEHOLDER, target))
            .collect()
    }

    /// Run a command, returning its stdout
    async fn run(&self, args: &[String]) -> AutobreakResult<String> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| AutobreakError::Proxy("empty proxy command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(rest);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(program = %program, args = ?rest, "Running proxy command");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AutobreakError::Proxy(format!("{} timed out", program)))?
            .map_err(|e| AutobreakError::Proxy(format!("Failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AutobreakError::Proxy(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Normalize query output: trim whitespace and one layer of quotes
fn normalize(output: &str) -> Option<String> {
    let trimmed = output.trim();
    let unquoted = ['\'', '"']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

#[async_trait]
impl ProxyApplier for CommandProxy {
    async fn current(&self) -> AutobreakResult<Option<String>> {
        let stdout = self.run(&self.query_command).await?;
        Ok(normalize(&stdout))
    }

    async fn set(&self, target: &str) -> AutobreakResult<()> {
        self.run(&self.set_args(target)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobreak_core::ProxyOutcome;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("'10.0.0.1'\n"), Some("10.0.0.1".to_string()));
        assert_eq!(normalize("\"http://a:8080\""), Some("http://a:8080".to_string()));
        assert_eq!(normalize("plain\n"), Some("plain".to_string()));
        assert_eq!(normalize("''\n"), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn test_set_args_substitutes_target() {
        let proxy = CommandProxy::new(
            strings(&["proxyctl", "get"]),
            strings(&["proxyctl", "set", "--host={target}"]),
        )
        .unwrap();
        assert_eq!(
            proxy.set_args("10.0.0.1"),
            strings(&["proxyctl", "set", "--host=10.0.0.1"])
        );
    }

    #[test]
    fn test_empty_commands_rejected() {
        let err = CommandProxy::new(vec![], strings(&["set", "{target}"])).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[cfg(unix)]
    fn file_proxy(path: &std::path::Path) -> CommandProxy {
        let path = path.display().to_string();
        CommandProxy::new(
            strings(&["cat", &path]),
            vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("printf '%s' \"$1\" > '{}'", path),
                "sh".to_string(),
                TARGET_PLACEHOLDER.to_string(),
            ],
        )
        .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apply_writes_then_skips() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let proxy = file_proxy(file.path());

        assert_eq!(proxy.current().await.unwrap(), None);

        let outcome = proxy.apply("http://10.0.0.1:8080").await.unwrap();
        assert_eq!(
            outcome,
            ProxyOutcome::Changed {
                previous: None,
                target: "http://10.0.0.1:8080".to_string(),
            }
        );
        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "http://10.0.0.1:8080"
        );

        let outcome = proxy.apply("http://10.0.0.1:8080").await.unwrap();
        assert!(matches!(outcome, ProxyOutcome::Unchanged { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_query_is_proxy_error() {
        let proxy = CommandProxy::new(strings(&["false"]), strings(&["true", "{target}"])).unwrap();
        let err = proxy.apply("10.0.0.1").await.unwrap_err();
        assert!(matches!(err, AutobreakError::Proxy(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_proxy_error() {
        let proxy = CommandProxy::new(
            strings(&["/nonexistent/proxyctl"]),
            strings(&["/nonexistent/proxyctl", "{target}"]),
        )
        .unwrap();
        let err = proxy.current().await.unwrap_err();
        assert!(matches!(err, AutobreakError::Proxy(_)));
    }
}

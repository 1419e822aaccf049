//! Configuration types for autobreak

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{AutobreakError, AutobreakResult, NodeSpec, Statistic};

/// Placeholder replaced by the chosen node address in the proxy target template
pub const NODE_PLACEHOLDER: &str = "{node}";

/// Placeholder replaced by the rendered proxy target in proxy commands
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Main configuration, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutobreakConfig {
    /// Candidate nodes
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    /// Probes per node per cycle
    pub repeat: u32,
    /// Statistic reducing a node's samples
    #[serde(default)]
    pub statistic: Statistic,
    /// Probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Schedule configuration
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// System proxy configuration; no proxy is touched when absent
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AutobreakConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> AutobreakResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutobreakError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> AutobreakResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the selection loop cannot run with
    pub fn validate(&self) -> AutobreakResult<()> {
        if self.nodes.is_empty() {
            return Err(AutobreakError::Config(
                "at least one node must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            let address = node.address();
            if address.trim().is_empty() {
                return Err(AutobreakError::Config(
                    "node address must not be empty".to_string(),
                ));
            }
            if !seen.insert(address) {
                return Err(AutobreakError::Config(format!(
                    "duplicate node address: {}",
                    address
                )));
            }
        }

        if self.repeat < 1 {
            return Err(AutobreakError::Config(format!(
                "repeat must be at least 1, got {}",
                self.repeat
            )));
        }

        self.statistic
            .validate()
            .map_err(|e| AutobreakError::Config(e.to_string()))?;
        self.probe.validate()?;
        self.schedule.validate()?;
        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }

        Ok(())
    }

    /// Get the configured nodes
    pub fn node_specs(&self) -> Vec<NodeSpec> {
        self.nodes.iter().map(NodeEntry::to_spec).collect()
    }
}

/// A node as written in the configuration file: a bare address or a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeEntry {
    /// `"10.0.0.1"`
    Address(String),
    /// `{ address = "10.0.0.1", latency = 35.0 }`
    Spec(NodeSpec),
}

impl NodeEntry {
    /// Get the node address
    pub fn address(&self) -> &str {
        match self {
            NodeEntry::Address(address) => address,
            NodeEntry::Spec(spec) => &spec.address,
        }
    }

    /// Convert to a node spec
    pub fn to_spec(&self) -> NodeSpec {
        match self {
            NodeEntry::Address(address) => NodeSpec::new(address.clone()),
            NodeEntry::Spec(spec) => spec.clone(),
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// How latency is measured
    pub method: ProbeMethod,
    /// Echo attempts per probe
    pub attempts: u32,
    /// Delay before each probe of a node, in milliseconds
    pub interval_ms: u64,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Icmp,
            attempts: 3,
            interval_ms: 1000,
            timeout_secs: 5,
        }
    }
}

impl ProbeConfig {
    fn validate(&self) -> AutobreakResult<()> {
        if self.attempts < 1 {
            return Err(AutobreakError::Config(format!(
                "probe.attempts must be at least 1, got {}",
                self.attempts
            )));
        }
        if self.timeout_secs == 0 {
            return Err(AutobreakError::Config(
                "probe.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before each probe
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Probe method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// ICMP echo via the system `ping` command
    Icmp,
    /// Timed HTTP GET against the node URL
    Http,
}

/// Schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between cycle starts
    pub period_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { period_secs: 120 }
    }
}

impl ScheduleConfig {
    fn validate(&self) -> AutobreakResult<()> {
        if self.period_secs == 0 {
            return Err(AutobreakError::Config(
                "schedule.period_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Time between cycle starts
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// System proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy target with `{node}` standing for the chosen node address
    #[serde(default = "default_target_template")]
    pub target_template: String,
    /// Command printing the current proxy target
    pub query_command: Vec<String>,
    /// Command setting the proxy; `{target}` is replaced in each argument
    pub set_command: Vec<String>,
}

fn default_target_template() -> String {
    NODE_PLACEHOLDER.to_string()
}

impl ProxyConfig {
    fn validate(&self) -> AutobreakResult<()> {
        if !self.target_template.contains(NODE_PLACEHOLDER) {
            return Err(AutobreakError::Config(format!(
                "proxy.target_template must contain {}",
                NODE_PLACEHOLDER
            )));
        }
        if self.query_command.is_empty() {
            return Err(AutobreakError::Config(
                "proxy.query_command must not be empty".to_string(),
            ));
        }
        if self.set_command.is_empty() {
            return Err(AutobreakError::Config(
                "proxy.set_command must not be empty".to_string(),
            ));
        }
        if !self.set_command.iter().any(|arg| arg.contains(TARGET_PLACEHOLDER)) {
            return Err(AutobreakError::Config(format!(
                "proxy.set_command must contain {}",
                TARGET_PLACEHOLDER
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (if any)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
nodes = ["10.0.0.1", "10.0.0.2"]
repeat = 5
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AutobreakConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.repeat, 5);
        assert_eq!(config.statistic, Statistic::Mean);
        assert_eq!(config.probe.method, ProbeMethod::Icmp);
        assert_eq!(config.probe.attempts, 3);
        assert_eq!(config.probe.interval(), Duration::from_secs(1));
        assert_eq!(config.schedule.period(), Duration::from_secs(120));
        assert!(config.proxy.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config_parse() {
        let toml_str = r#"
repeat = 3
statistic = { percentile = 90 }
nodes = [
    "a.example.org",
    { address = "b.example.org", latency = 35.5 },
]

[probe]
method = "http"
attempts = 2
interval_ms = 250
timeout_secs = 3

[schedule]
period_secs = 60

[proxy]
target_template = "http://{node}:8080"
query_command = ["proxyctl", "get"]
set_command = ["proxyctl", "set", "{target}"]

[logging]
level = "debug"
"#;
        let config = AutobreakConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.statistic, Statistic::Percentile(90));
        assert_eq!(config.probe.method, ProbeMethod::Http);
        assert_eq!(config.schedule.period_secs, 60);

        let nodes = config.node_specs();
        assert_eq!(nodes[0], NodeSpec::new("a.example.org"));
        assert_eq!(nodes[1], NodeSpec::new("b.example.org").with_latency(35.5));

        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.target_template, "http://{node}:8080");
        assert_eq!(proxy.set_command.len(), 3);
    }

    #[test]
    fn test_rejects_zero_repeat() {
        let err = AutobreakConfig::from_toml("nodes = [\"a\"]\nrepeat = 0\n").unwrap_err();
        assert!(matches!(err, AutobreakError::Config(_)));
        assert!(err.to_string().contains("repeat"));
    }

    #[test]
    fn test_rejects_negative_repeat() {
        let err = AutobreakConfig::from_toml("nodes = [\"a\"]\nrepeat = -2\n").unwrap_err();
        assert!(matches!(err, AutobreakError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_nodes() {
        let err = AutobreakConfig::from_toml("nodes = []\nrepeat = 1\n").unwrap_err();
        assert!(err.to_string().contains("at least one node"));
    }

    #[test]
    fn test_rejects_duplicate_nodes() {
        let err =
            AutobreakConfig::from_toml("nodes = [\"a\", { address = \"a\" }]\nrepeat = 1\n")
                .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_rejects_bad_percentile() {
        let toml_str = "nodes = [\"a\"]\nrepeat = 1\nstatistic = { percentile = 0 }\n";
        assert!(AutobreakConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let toml_str = r#"
nodes = ["a"]
repeat = 1

[proxy]
target_template = "http://fixed:8080"
query_command = ["get"]
set_command = ["set", "{target}"]
"#;
        let err = AutobreakConfig::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("target_template"));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = AutobreakConfig::from_toml("nodes = [").unwrap_err();
        assert!(matches!(err, AutobreakError::Config(_)));
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_rejects_blank_node_address() {
        let err = AutobreakConfig::from_toml("nodes = [\"a\", \"  \"]\nrepeat = 1\n").unwrap_err();
        assert!(matches!(err, AutobreakError::Config(_)));
        assert!(err.to_string().contains("node address must not be empty"));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let toml_str = "nodes = [\"a\"]\nrepeat = 1\n\n[probe]\nattempts = 0\n";
        let err = AutobreakConfig::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("probe.attempts must be at least 1"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let toml_str = "nodes = [\"a\"]\nrepeat = 1\n\n[probe]\ntimeout_secs = 0\n";
        let err = AutobreakConfig::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("probe.timeout_secs"));
    }

    #[test]
    fn test_rejects_zero_period() {
        let toml_str = "nodes = [\"a\"]\nrepeat = 1\n\n[schedule]\nperiod_secs = 0\n";
        let err = AutobreakConfig::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("schedule.period_secs"));
    }

    fn with_proxy(query_command: &str, set_command: &str) -> String {
        format!(
            "nodes = [\"a\"]\nrepeat = 1\n\n[proxy]\ntarget_template = \"{{node}}\"\nquery_command = {}\nset_command = {}\n",
            query_command, set_command
        )
    }

    #[test]
    fn test_accepts_proxy_commands() {
        let config = AutobreakConfig::from_toml(&with_proxy(r#"["get"]"#, r#"["set", "{target}"]"#))
            .unwrap();
        assert!(config.proxy.is_some());
    }

    #[test]
    fn test_rejects_empty_query_command() {
        let err = AutobreakConfig::from_toml(&with_proxy("[]", r#"["set", "{target}"]"#))
            .unwrap_err();
        assert!(err.to_string().contains("proxy.query_command must not be empty"));
    }

    #[test]
    fn test_rejects_empty_set_command() {
        let err = AutobreakConfig::from_toml(&with_proxy(r#"["get"]"#, "[]")).unwrap_err();
        assert!(err.to_string().contains("proxy.set_command must not be empty"));
    }

    #[test]
    fn test_rejects_set_command_without_target() {
        let err = AutobreakConfig::from_toml(&with_proxy(r#"["get"]"#, r#"["set", "fixed"]"#))
            .unwrap_err();
        assert!(err.to_string().contains("proxy.set_command must contain {target}"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = AutobreakConfig::from_file(file.path()).unwrap();
        assert_eq!(config.nodes.len(), 2);
    }

    #[test]
    fn test_from_missing_file() {
        let err = AutobreakConfig::from_file(Path::new("/nonexistent/autobreak.toml")).unwrap_err();
        assert!(matches!(err, AutobreakError::Config(_)));
    }
}

//! Pointing the system proxy at a chosen node

use autobreak_core::{AutobreakResult, ProxyConfig, ProxyOutcome, NODE_PLACEHOLDER};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::command::CommandProxy;
use crate::traits::ProxyApplier;

/// Render the proxy target for a node address
pub fn render_target(template: &str, address: &str) -> String {
    template.replace(NODE_PLACEHOLDER, address)
}

/// Switches the system proxy to the node chosen by each cycle
pub struct ProxySwitch {
    applier: Arc<dyn ProxyApplier>,
    /// Target template containing `{node}`
    template: String,
}

impl ProxySwitch {
    /// Create a new proxy switch
    pub fn new(applier: Arc<dyn ProxyApplier>, template: impl Into<String>) -> Self {
        Self {
            applier,
            template: template.into(),
        }
    }

    /// Create a command-driven proxy switch from configuration
    pub fn from_config(config: &ProxyConfig) -> AutobreakResult<Self> {
        let applier = CommandProxy::from_config(config)?;
        Ok(Self::new(Arc::new(applier), config.target_template.clone()))
    }

    /// Point the proxy at `address`
    ///
    /// Failures are reported in the outcome rather than returned; the next
    /// cycle tries again.
    pub async fn switch_to(&self, address: &str) -> ProxyOutcome {
        let target = render_target(&self.template, address);

        match self.applier.apply(&target).await {
            Ok(outcome) => {
                match &outcome {
                    ProxyOutcome::Changed { previous, target } => {
                        info!(
                            applier = self.applier.name(),
                            previous = previous.as_deref().unwrap_or("<unset>"),
                            proxy_target = %target,
                            "Proxy changed"
                        );
                    }
                    _ => {
                        debug!(proxy_target = %target, "Proxy already points at target");
                    }
                }
                outcome
            }
            Err(e) => {
                error!(
                    applier = self.applier.name(),
                    proxy_target = %target,
                    error = %e,
                    "Failed to apply proxy, will retry next cycle"
                );
                ProxyOutcome::Failed {
                    target,
                    error: e.to_string(),
                }
            }
        }
    }
}

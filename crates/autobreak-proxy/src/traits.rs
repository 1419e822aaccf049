//! Proxy applier trait definitions

use async_trait::async_trait;
use autobreak_core::{AutobreakResult, ProxyOutcome};

/// Reads and writes the host's system proxy setting
#[async_trait]
pub trait ProxyApplier: Send + Sync {
    /// Get the current proxy target, `None` when unset
    async fn current(&self) -> AutobreakResult<Option<String>>;

    /// Point the proxy at `target`
    async fn set(&self, target: &str) -> AutobreakResult<()>;

    /// Get the applier name
    fn name(&self) -> &'static str;

    /// Point the proxy at `target`, skipping the write when it already does
    async fn apply(&self, target: &str) -> AutobreakResult<ProxyOutcome> {
        let previous = self.current().await?;
        if previous.as_deref() == Some(target) {
            return Ok(ProxyOutcome::Unchanged {
                target: target.to_string(),
            });
        }

        self.set(target).await?;
        Ok(ProxyOutcome::Changed {
            previous,
            target: target.to_string(),
        })
    }
}

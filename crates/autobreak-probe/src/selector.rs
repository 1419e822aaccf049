//! Minimum-latency node selection

use autobreak_core::{AutobreakError, AutobreakResult, LatencyMap, Selection};
use tracing::debug;

/// Pick the node with the lowest representative latency
///
/// The map iterates in address order and only a strictly lower latency
/// replaces the current best, so among equal minima the lexicographically
/// smallest address wins. NaN latencies never win.
pub fn select(latencies: &LatencyMap) -> AutobreakResult<Selection> {
    if latencies.is_empty() {
        return Err(AutobreakError::InvalidArgument(
            "cannot select from an empty latency map".to_string(),
        ));
    }

    let mut best: Option<(&str, f64)> = None;
    for (address, &latency) in latencies {
        if latency.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if latency >= current => {}
            _ => best = Some((address.as_str(), latency)),
        }
    }

    let (address, latency) = best.ok_or_else(|| {
        AutobreakError::InvalidArgument("no comparable latency in map".to_string())
    })?;

    debug!(
        selected = %address,
        latency_ms = latency,
        candidates = latencies.len(),
        "Selected node"
    );

    Ok(Selection {
        address: address.to_string(),
        latency,
    })
}

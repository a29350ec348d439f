//! Retention policy bounding the memory held by the registry.

use crate::registry::NodeRegistry;

/// Which terminal nodes a flush removes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushOptions {
    pub include_complete: bool,
    pub include_error: bool,
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self {
            include_complete: true,
            include_error: true,
        }
    }
}

impl FlushOptions {
    /// Trim values only; keep every node.
    pub fn values_only() -> Self {
        Self {
            include_complete: false,
            include_error: false,
        }
    }
}

/// What a flush did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub nodes_removed: usize,
    pub values_flushed: usize,
}

/// Remove terminal nodes selected by `options` and trim every remaining
/// subscription to its `kept_values` most recent values.
///
/// Snapshots taken earlier hold their own copies and are unaffected.
pub fn flush(registry: &mut NodeRegistry, options: FlushOptions, kept_values: usize) -> FlushSummary {
    let mut values_flushed = 0;
    let nodes_removed = registry.retain(|node| {
        let evict = (options.include_complete && node.complete)
            || (options.include_error && node.error.is_some());
        if evict {
            return false;
        }
        for subscription in &mut node.subscriptions {
            values_flushed += subscription.trim_values(kept_values);
        }
        true
    });

    let summary = FlushSummary {
        nodes_removed,
        values_flushed,
    };
    tracing::debug!(
        nodes_removed,
        values_flushed,
        remaining = registry.len(),
        "flushed registry"
    );
    summary
}

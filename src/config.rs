//! Configuration for the spy.

use crate::error::{Result, SpyError};
use serde::{Deserialize, Serialize};

/// Default number of values kept per subscription after a flush.
pub const DEFAULT_KEPT_VALUES: usize = 4;

/// Default bound on the notification stack.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;

/// Spy configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyConfig {
    /// Most recent values retained per subscription when flushing.
    /// Default: 4
    pub kept_values: usize,

    /// Maximum nesting of notifications tracked on the stack.
    /// Default: 1024
    pub max_stack_depth: usize,

    /// Record the call site of each subscription.
    pub capture_call_sites: bool,

    /// Emit a warning when a notification names an untracked stage.
    pub warn_on_unknown_stage: bool,
}

impl Default for SpyConfig {
    fn default() -> Self {
        Self {
            kept_values: DEFAULT_KEPT_VALUES,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            capture_call_sites: true,
            warn_on_unknown_stage: true,
        }
    }
}

impl SpyConfig {
    /// Builder method to set the retained value count.
    #[must_use]
    pub fn with_kept_values(mut self, kept_values: usize) -> Self {
        self.kept_values = kept_values;
        self
    }

    /// Builder method to set the stack bound.
    #[must_use]
    pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    /// Builder method to toggle call-site capture.
    #[must_use]
    pub fn with_call_sites(mut self, capture: bool) -> Self {
        self.capture_call_sites = capture;
        self
    }

    /// Builder method to toggle unknown-stage warnings.
    #[must_use]
    pub fn with_unknown_stage_warnings(mut self, warn: bool) -> Self {
        self.warn_on_unknown_stage = warn;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.kept_values == 0 {
            return Err(SpyError::InvalidConfig(
                "kept_values must be at least 1".to_string(),
            ));
        }
        if self.max_stack_depth == 0 {
            return Err(SpyError::InvalidConfig(
                "max_stack_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpyConfig::default();
        assert_eq!(config.kept_values, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_kept_values() {
        let config = SpyConfig::default().with_kept_values(0);
        assert!(matches!(config.validate(), Err(SpyError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SpyConfig = serde_json::from_str(r#"{"kept_values": 10}"#).unwrap();
        assert_eq!(config.kept_values, 10);
        assert_eq!(config.max_stack_depth, DEFAULT_MAX_STACK_DEPTH);
        assert!(config.capture_call_sites);
    }
}

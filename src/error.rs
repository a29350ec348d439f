//! Error types for the pipeline spy.

use crate::types::{Notification, StageId, SubscriberId};
use thiserror::Error;

/// Main error type for spy operations.
///
/// None of these are fatal to the host pipeline: hooks log them and hand them
/// back so the instrumentation layer can decide whether to care.
#[derive(Debug, Error)]
pub enum SpyError {
    #[error("Stage not found: {0}; subscriptions made before the spy attached are not tracked")]
    StageNotFound(StageId),

    #[error("Subscription not found: stage {stage}, subscriber {subscriber}")]
    SubscriptionNotFound {
        stage: StageId,
        subscriber: SubscriberId,
    },

    #[error("Unbalanced notification: after-{expected} with {found}")]
    UnbalancedNotification {
        expected: Notification,
        found: String,
    },

    #[error("Notification stack exceeded {0} entries")]
    StackOverflow(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),
}

impl From<serde_json::Error> for SpyError {
    fn from(e: serde_json::Error) -> Self {
        SpyError::Serialization(e.to_string())
    }
}

/// Result type for spy operations.
pub type Result<T> = std::result::Result<T, SpyError>;

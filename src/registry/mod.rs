//! Live graph of tracked pipeline stages.
//!
//! One [`GraphNode`] per stage, keyed by [`StageId`](crate::StageId). Edges
//! between nodes are stored as stage ids, so shared sub-pipelines and cycles
//! need no shared ownership.

mod index;
mod node;

pub use index::NodeRegistry;
pub use node::{GraphNode, SubscriptionRecord};

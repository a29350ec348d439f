//! Point-in-time copies of the tracked graph.
//!
//! A [`Snapshot`] shares nothing with the live registry: subscription values
//! are copied by value and edges are re-pointed at sibling copies inside the
//! same snapshot. Passing an earlier snapshot as `since` yields only the nodes
//! that changed after it, which is cheap enough to poll.

mod builder;
mod types;

pub use builder::{build_snapshot, SnapshotOptions};
pub use types::{NodeIndex, Snapshot, SnapshotNode};

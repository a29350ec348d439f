//! Builds snapshots from the live registry.

use super::types::{NodeIndex, Snapshot, SnapshotNode};
use crate::registry::{GraphNode, NodeRegistry};
use crate::types::{StageId, Tick};
use std::collections::HashMap;
use std::fmt;

/// Options for [`build_snapshot`].
#[derive(Clone, Copy, Default)]
pub struct SnapshotOptions<'a> {
    /// Keep only nodes matching this predicate.
    pub filter: Option<&'a dyn Fn(&GraphNode) -> bool>,

    /// Keep only nodes changed after this snapshot was taken.
    pub since: Option<&'a Snapshot>,
}

impl<'a> SnapshotOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: &'a dyn Fn(&GraphNode) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn since(mut self, since: &'a Snapshot) -> Self {
        self.since = Some(since);
        self
    }

    fn includes(&self, node: &GraphNode) -> bool {
        if let Some(since) = self.since {
            if node.tick <= since.tick {
                return false;
            }
        }
        self.filter.map_or(true, |filter| filter(node))
    }
}

impl fmt::Debug for SnapshotOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotOptions")
            .field("filter", &self.filter.is_some())
            .field("since", &self.since.map(|s| s.tick))
            .finish()
    }
}

/// Copy the registry into a snapshot stamped with `tick`.
///
/// The first pass copies every selected node and records where each copy
/// landed; the second rewrites edges through that map. Edges to nodes that
/// were not selected (or are no longer tracked) are dropped, so every index
/// in the result points inside the result.
pub fn build_snapshot(registry: &NodeRegistry, tick: Tick, options: &SnapshotOptions<'_>) -> Snapshot {
    let selected: Vec<&GraphNode> = registry.iter().filter(|n| options.includes(n)).collect();

    let mut positions: HashMap<StageId, NodeIndex> = HashMap::with_capacity(selected.len());
    let mut nodes: Vec<SnapshotNode> = Vec::with_capacity(selected.len());
    for node in &selected {
        positions.insert(node.stage, nodes.len());
        nodes.push(SnapshotNode::unlinked(node));
    }

    for (copy, live) in nodes.iter_mut().zip(&selected) {
        copy.dependencies = relink(&live.dependencies, &positions);
        copy.dependents = relink(&live.dependents, &positions);
        copy.merges = relink(&live.merges, &positions);
    }

    Snapshot { nodes, tick }
}

fn relink(edges: &[StageId], positions: &HashMap<StageId, NodeIndex>) -> Vec<NodeIndex> {
    edges.iter().filter_map(|s| positions.get(s).copied()).collect()
}

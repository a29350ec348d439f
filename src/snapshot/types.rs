//! Snapshot types.

use crate::error::Result;
use crate::registry::{GraphNode, SubscriptionRecord};
use crate::types::{StageId, Tick};
use serde::{Deserialize, Serialize};

/// Position of a node within its snapshot's `nodes`.
pub type NodeIndex = usize;

/// Copy of one graph node at the time the snapshot was built.
///
/// Edges are indices into the owning [`Snapshot`]'s `nodes`, never into the
/// live registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub stage: StageId,
    pub tag: Option<String>,
    pub type_name: String,
    pub tick: Tick,
    pub complete: bool,
    pub error: Option<serde_json::Value>,
    pub dependencies: Vec<NodeIndex>,
    pub dependents: Vec<NodeIndex>,
    pub merges: Vec<NodeIndex>,
    pub subscriptions: Vec<SubscriptionRecord>,
}

impl SnapshotNode {
    /// Copy scalar fields and subscriptions; edges are filled in afterwards.
    pub(crate) fn unlinked(node: &GraphNode) -> Self {
        Self {
            stage: node.stage,
            tag: node.tag.clone(),
            type_name: node.type_name.clone(),
            tick: node.tick,
            complete: node.complete,
            error: node.error.clone(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            merges: Vec::new(),
            subscriptions: node.subscriptions.clone(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.complete || self.error.is_some()
    }

    /// True if any current subscription is a root entry point.
    pub fn is_root(&self) -> bool {
        self.subscriptions.iter().any(|s| s.explicit)
    }
}

/// Independent, self-consistent copy of the graph at one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<SnapshotNode>,
    pub tick: Tick,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: NodeIndex) -> Option<&SnapshotNode> {
        self.nodes.get(index)
    }

    pub fn node(&self, stage: StageId) -> Option<&SnapshotNode> {
        self.nodes.iter().find(|n| n.stage == stage)
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<&SnapshotNode> {
        self.nodes
            .iter()
            .filter(|n| n.tag.as_deref() == Some(tag))
            .collect()
    }

    pub fn dependencies_of<'a>(
        &'a self,
        node: &'a SnapshotNode,
    ) -> impl Iterator<Item = &'a SnapshotNode> + 'a {
        node.dependencies.iter().filter_map(move |&i| self.get(i))
    }

    pub fn dependents_of<'a>(
        &'a self,
        node: &'a SnapshotNode,
    ) -> impl Iterator<Item = &'a SnapshotNode> + 'a {
        node.dependents.iter().filter_map(move |&i| self.get(i))
    }

    pub fn merges_of<'a>(
        &'a self,
        node: &'a SnapshotNode,
    ) -> impl Iterator<Item = &'a SnapshotNode> + 'a {
        node.merges.iter().filter_map(move |&i| self.get(i))
    }

    /// Nodes with at least one explicit subscription.
    pub fn roots(&self) -> impl Iterator<Item = &SnapshotNode> {
        self.nodes.iter().filter(|n| n.is_root())
    }

    /// Render for a log sink.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

//! Identity-keyed index of graph nodes.

use super::node::{add_once, GraphNode, SubscriptionRecord};
use crate::types::{StageId, SubscriberId, Tick};
use std::collections::{HashMap, HashSet};

/// Maps each tracked stage to its graph node.
///
/// Iteration follows node creation order.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    /// Stage -> node.
    nodes: HashMap<StageId, GraphNode>,

    /// Creation order of the stages in `nodes`.
    order: Vec<StageId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the node for `stage`, building it with `create` if it is not tracked yet.
    ///
    /// Returns the node and whether it was created by this call.
    pub fn get_or_create<F>(&mut self, stage: StageId, create: F) -> (&mut GraphNode, bool)
    where
        F: FnOnce() -> GraphNode,
    {
        let created = !self.nodes.contains_key(&stage);
        if created {
            self.order.push(stage);
        }
        let node = self.nodes.entry(stage).or_insert_with(create);
        (node, created)
    }

    pub fn lookup(&self, stage: StageId) -> Option<&GraphNode> {
        self.nodes.get(&stage)
    }

    pub fn lookup_mut(&mut self, stage: StageId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&stage)
    }

    pub fn lookup_subscription(
        &self,
        stage: StageId,
        subscriber: SubscriberId,
    ) -> Option<&SubscriptionRecord> {
        self.nodes.get(&stage)?.subscription(subscriber)
    }

    pub fn contains(&self, stage: StageId) -> bool {
        self.nodes.contains_key(&stage)
    }

    /// Remove a node and every edge pointing at it from the remaining nodes.
    pub fn remove(&mut self, stage: StageId) -> Option<GraphNode> {
        let node = self.nodes.remove(&stage)?;
        self.order.retain(|s| *s != stage);
        self.unlink(&HashSet::from([stage]));
        Some(node)
    }

    /// Keep only nodes for which `keep` returns true. Returns the removed count.
    ///
    /// Edges to removed nodes are dropped from the survivors.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&mut GraphNode) -> bool,
    {
        let mut removed = HashSet::new();
        self.nodes.retain(|stage, node| {
            let kept = keep(node);
            if !kept {
                removed.insert(*stage);
            }
            kept
        });
        if !removed.is_empty() {
            let nodes = &self.nodes;
            self.order.retain(|s| nodes.contains_key(s));
            self.unlink(&removed);
        }
        removed.len()
    }

    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&GraphNode),
    {
        for node in self.iter() {
            visit(node);
        }
    }

    /// Nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.order.iter().filter_map(|s| self.nodes.get(s))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }

    /// Drop every edge that points at one of `gone`.
    ///
    /// Merges are only stored on the source, so every node is visited.
    fn unlink(&mut self, gone: &HashSet<StageId>) {
        for node in self.nodes.values_mut() {
            node.dependencies.retain(|s| !gone.contains(s));
            node.dependents.retain(|s| !gone.contains(s));
            node.merges.retain(|s| !gone.contains(s));
        }
    }

    /// Record that `dependent` subscribed to `dependency` during its own subscribe.
    ///
    /// Both ends are updated; re-adding an existing edge changes nothing.
    /// Returns true if the edge is new.
    pub fn add_dependency(&mut self, dependent: StageId, dependency: StageId, tick: Tick) -> bool {
        if !self.nodes.contains_key(&dependent) || !self.nodes.contains_key(&dependency) {
            return false;
        }

        let mut added = false;
        if let Some(node) = self.nodes.get_mut(&dependent) {
            if add_once(&mut node.dependencies, dependency) {
                node.touch(tick);
                added = true;
            }
        }
        if let Some(node) = self.nodes.get_mut(&dependency) {
            if add_once(&mut node.dependents, dependent) {
                node.touch(tick);
                added = true;
            }
        }
        added
    }

    /// Record that `merged` was subscribed to while a value of `source` was delivered.
    pub fn add_merge(&mut self, source: StageId, merged: StageId, tick: Tick) -> bool {
        if !self.nodes.contains_key(&merged) {
            return false;
        }
        match self.nodes.get_mut(&source) {
            Some(node) => {
                let added = add_once(&mut node.merges, merged);
                if added {
                    node.touch(tick);
                }
                added
            }
            None => false,
        }
    }
}

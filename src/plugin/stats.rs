//! Notification counters.

use super::{HookContext, Plugin};
use crate::error::Result;
use crate::types::{Tick, Timestamp};
use serde::{Deserialize, Serialize};

/// Event counts since the spy started.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub completes: u64,
    pub errors: u64,
    /// Subscriptions to stages that subscribed to nothing themselves.
    pub leaf_subscribes: u64,
    /// Deepest nesting seen for a leaf subscribe.
    pub max_depth: u64,
    /// Subscriptions to stages merged in by another stage's next.
    pub merged_subscribes: u64,
    pub nexts: u64,
    /// Explicit subscriptions, not nested in another subscribe or a next.
    pub root_subscribes: u64,
    pub subscribes: u64,
    pub unsubscribes: u64,
    pub tick: Tick,
    /// Microseconds between the first and the latest counted notification.
    pub timespan_micros: i64,
    /// Sum of leaf subscribe depths. Divide by `leaf_subscribes` for the mean.
    pub total_depth: u64,
}

/// Counts notifications. Reads the graph, never changes it.
#[derive(Debug, Default)]
pub struct StatsPlugin {
    stats: Stats,
    started: Option<Timestamp>,
}

impl StatsPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Stats {
        self.stats.clone()
    }

    fn stamp(&mut self, tick: Tick) {
        let now = Timestamp::now();
        match self.started {
            None => self.started = Some(now),
            Some(started) => self.stats.timespan_micros = now.micros_since(started),
        }
        self.stats.tick = tick;
    }
}

impl Plugin for StatsPlugin {
    fn name(&self) -> &str {
        "stats"
    }

    fn before_subscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        self.stats.subscribes += 1;
        self.stamp(ctx.tick);
        Ok(())
    }

    fn after_subscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        let Some(node) = ctx.graph.lookup(ctx.stage) else {
            return Ok(());
        };
        if node
            .subscription(ctx.subscriber)
            .is_some_and(|record| record.explicit)
        {
            self.stats.root_subscribes += 1;
        }
        if ctx.graph.iter().any(|source| source.merges.contains(&ctx.stage)) {
            self.stats.merged_subscribes += 1;
        }
        if node.dependencies.is_empty() && node.merges.is_empty() {
            let depth = ctx.depth as u64;
            self.stats.leaf_subscribes += 1;
            self.stats.max_depth = self.stats.max_depth.max(depth);
            self.stats.total_depth += depth;
        }
        Ok(())
    }

    fn before_next(&mut self, ctx: &HookContext<'_>, _value: &serde_json::Value) -> Result<()> {
        self.stats.nexts += 1;
        self.stamp(ctx.tick);
        Ok(())
    }

    fn before_complete(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        self.stats.completes += 1;
        self.stamp(ctx.tick);
        Ok(())
    }

    fn before_error(&mut self, ctx: &HookContext<'_>, _error: &serde_json::Value) -> Result<()> {
        self.stats.errors += 1;
        self.stamp(ctx.tick);
        Ok(())
    }

    fn before_unsubscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        self.stats.unsubscribes += 1;
        self.stamp(ctx.tick);
        Ok(())
    }

    fn teardown(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GraphNode, NodeRegistry, SubscriptionRecord};
    use crate::types::{StageId, SubscriberId};
    use serde_json::json;

    fn ctx(graph: &NodeRegistry, stage: u64, tick: u64) -> HookContext<'_> {
        HookContext {
            stage: StageId(stage),
            subscriber: SubscriberId(stage),
            graph,
            tick: Tick(tick),
            depth: 0,
        }
    }

    #[test]
    fn test_counts_each_kind() {
        let graph = NodeRegistry::new();
        let mut plugin = StatsPlugin::new();

        plugin.before_subscribe(&ctx(&graph, 1, 1)).unwrap();
        plugin.before_next(&ctx(&graph, 1, 2), &json!(1)).unwrap();
        plugin.before_next(&ctx(&graph, 1, 3), &json!(2)).unwrap();
        plugin.before_error(&ctx(&graph, 1, 4), &json!("e")).unwrap();
        plugin.before_unsubscribe(&ctx(&graph, 1, 5)).unwrap();

        let stats = plugin.stats();
        assert_eq!(stats.subscribes, 1);
        assert_eq!(stats.nexts, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.unsubscribes, 1);
        assert_eq!(stats.completes, 0);
        assert_eq!(stats.tick, Tick(5));
        assert!(stats.timespan_micros >= 0);
    }

    #[test]
    fn test_root_and_leaf_subscribes_read_the_graph() {
        let mut graph = NodeRegistry::new();
        let (node, _) = graph.get_or_create(StageId(1), || {
            GraphNode::new(StageId(1), "Subject".into(), None, Tick(1))
        });
        node.subscriptions
            .push(SubscriptionRecord::new(SubscriberId(1), true, None));

        let mut plugin = StatsPlugin::new();
        plugin.after_subscribe(&ctx(&graph, 1, 1)).unwrap();
        plugin.after_subscribe(&ctx(&graph, 9, 1)).unwrap();

        let stats = plugin.stats();
        assert_eq!(stats.root_subscribes, 1);
        assert_eq!(stats.leaf_subscribes, 1);
        assert_eq!(stats.merged_subscribes, 0);
    }

    #[test]
    fn test_merged_subscribes_and_leaf_depth() {
        let mut graph = NodeRegistry::new();
        for stage in 1..=2 {
            graph.get_or_create(StageId(stage), || {
                GraphNode::new(StageId(stage), "Subject".into(), None, Tick(stage))
            });
        }
        graph.add_merge(StageId(1), StageId(2), Tick(3));

        let mut plugin = StatsPlugin::new();
        let mut nested = ctx(&graph, 2, 3);
        nested.depth = 3;
        plugin.after_subscribe(&nested).unwrap();
        let mut shallow = ctx(&graph, 2, 4);
        shallow.depth = 1;
        plugin.after_subscribe(&shallow).unwrap();
        plugin.after_subscribe(&ctx(&graph, 1, 5)).unwrap();

        let stats = plugin.stats();
        assert_eq!(stats.merged_subscribes, 2);
        assert_eq!(stats.leaf_subscribes, 2);
        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.total_depth, 4);
    }
}

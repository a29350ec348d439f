//! The spy as a host: plugins, stats, call sites and shared use.

use pipespy::{
    HookContext, Plugin, Result, SnapshotOptions, Spy, SpyConfig, StageId, StageTable,
    SubscriberId,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::thread;

/// Stand-in for an instrumentation layer wrapping a pipeline's subscribe.
struct Instrumented<'a> {
    spy: &'a Spy,
}

impl Instrumented<'_> {
    #[track_caller]
    fn subscribe(&self, stage: u64, subscriber: u64) {
        let _ = self
            .spy
            .before_subscribe(StageId(stage), SubscriberId(subscriber));
        let _ = self
            .spy
            .after_subscribe(StageId(stage), SubscriberId(subscriber));
    }
}

/// Records the explicit flag of every subscription it sees close.
struct ExplicitRecorder {
    seen: Arc<Mutex<Vec<(StageId, bool)>>>,
}

impl Plugin for ExplicitRecorder {
    fn name(&self) -> &str {
        "explicit-recorder"
    }

    fn after_subscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        if let Some(record) = ctx.graph.lookup_subscription(ctx.stage, ctx.subscriber) {
            self.seen.lock().push((ctx.stage, record.explicit));
        }
        Ok(())
    }
}

#[test]
fn test_call_site_skips_instrumentation_frames() {
    let spy = Spy::new(Arc::new(StageTable::new()));
    let layer = Instrumented { spy: &spy };

    let line = line!() + 1;
    layer.subscribe(1, 1);

    let record = spy.peek_at_subscription(StageId(1), SubscriberId(1)).unwrap();
    let site = record.call_site.unwrap();
    assert_eq!(site.line, line);
    assert!(site.file.ends_with("spy_host.rs"));
}

#[test]
fn test_call_sites_can_be_disabled() {
    let spy = Spy::with_config(
        SpyConfig::default().with_call_sites(false),
        Arc::new(StageTable::new()),
    )
    .unwrap();
    Instrumented { spy: &spy }.subscribe(1, 1);

    let record = spy.peek_at_subscription(StageId(1), SubscriberId(1)).unwrap();
    assert!(record.call_site.is_none());
}

#[test]
fn test_plugins_read_the_graph() {
    let spy = Spy::new(Arc::new(StageTable::new()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    spy.plug(Box::new(ExplicitRecorder {
        seen: Arc::clone(&seen),
    }));

    spy.before_subscribe(StageId(1), SubscriberId(1)).unwrap();
    spy.before_subscribe(StageId(2), SubscriberId(2)).unwrap();
    spy.after_subscribe(StageId(2), SubscriberId(2)).unwrap();
    spy.after_subscribe(StageId(1), SubscriberId(1)).unwrap();

    assert_eq!(
        *seen.lock(),
        vec![(StageId(2), false), (StageId(1), true)]
    );

    spy.unplug("explicit-recorder").unwrap();
    Instrumented { spy: &spy }.subscribe(3, 3);
    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn test_stats_count_notifications() {
    let spy = Spy::new(Arc::new(StageTable::new()));

    spy.before_subscribe(StageId(1), SubscriberId(1)).unwrap();
    spy.before_subscribe(StageId(2), SubscriberId(2)).unwrap();
    spy.after_subscribe(StageId(2), SubscriberId(2)).unwrap();
    spy.after_subscribe(StageId(1), SubscriberId(1)).unwrap();

    for i in 0..3 {
        spy.before_next(StageId(2), SubscriberId(2), json!(i)).unwrap();
        spy.after_next(StageId(2), SubscriberId(2)).unwrap();
    }
    spy.before_unsubscribe(StageId(1), SubscriberId(1)).unwrap();
    spy.after_unsubscribe(StageId(1), SubscriberId(1)).unwrap();

    // Untracked stages are still counted.
    let _ = spy.before_complete(StageId(9), SubscriberId(9));
    let _ = spy.after_complete(StageId(9), SubscriberId(9));

    let stats = spy.stats();
    assert_eq!(stats.subscribes, 2);
    assert_eq!(stats.root_subscribes, 1);
    assert_eq!(stats.leaf_subscribes, 1);
    assert_eq!(stats.max_depth, 1);
    assert_eq!(stats.total_depth, 1);
    assert_eq!(stats.merged_subscribes, 0);
    assert_eq!(stats.nexts, 3);
    assert_eq!(stats.unsubscribes, 1);
    assert_eq!(stats.completes, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.tick, spy.tick());
}

#[test]
fn test_shared_across_threads() {
    let spy = Arc::new(Spy::new(Arc::new(StageTable::new())));

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let spy = Arc::clone(&spy);
            thread::spawn(move || {
                for i in 0..25u64 {
                    let stage = StageId(t * 100 + i);
                    let subscriber = SubscriberId(t * 100 + i);
                    spy.before_subscribe(stage, subscriber).unwrap();
                    spy.after_subscribe(stage, subscriber).unwrap();
                    spy.before_next(stage, subscriber, json!(i)).unwrap();
                    spy.after_next(stage, subscriber).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = spy.snapshot(SnapshotOptions::new());
    assert_eq!(snapshot.len(), 100);
    assert!(snapshot.nodes.iter().all(|n| n.subscriptions[0].values.len() == 1));
    assert_eq!(spy.depth(), 0);
}

#[test]
fn test_teardown_resets_everything() {
    let spy = Spy::new(Arc::new(StageTable::new()));
    Instrumented { spy: &spy }.subscribe(1, 1);
    spy.teardown();

    assert_eq!(spy.node_count(), 0);
    assert_eq!(spy.stats().subscribes, 0);
    assert!(spy.snapshot(SnapshotOptions::new()).is_empty());
}

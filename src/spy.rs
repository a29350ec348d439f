//! Main Spy struct tying all components together.

use crate::config::SpyConfig;
use crate::correlator::EventCorrelator;
use crate::error::{Result, SpyError};
use crate::plugin::{HookContext, Plugin, Stats, StatsPlugin};
use crate::registry::{GraphNode, SubscriptionRecord};
use crate::resolver::StageResolver;
use crate::retention::{self, FlushOptions, FlushSummary};
use crate::snapshot::{build_snapshot, Snapshot, SnapshotOptions};
use crate::tick::TickClock;
use crate::types::{CallSite, StageId, SubscriberId, Tick};
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything mutated by notifications, guarded by one lock.
struct SpyState {
    correlator: EventCorrelator,
    stats: StatsPlugin,
    plugins: Vec<Box<dyn Plugin>>,
}

impl SpyState {
    /// Run `hook` on every plugin, stats first. Returns the first error.
    fn dispatch<F>(&mut self, stage: StageId, subscriber: SubscriberId, mut hook: F) -> Result<()>
    where
        F: FnMut(&mut dyn Plugin, &HookContext<'_>) -> Result<()>,
    {
        let ctx = HookContext {
            stage,
            subscriber,
            graph: self.correlator.registry(),
            tick: self.correlator.clock().current(),
            depth: self.correlator.depth(),
        };

        let mut first = Ok(());
        run_hook(&mut self.stats, &ctx, &mut hook, &mut first);
        for plugin in &mut self.plugins {
            run_hook(plugin.as_mut(), &ctx, &mut hook, &mut first);
        }
        first
    }
}

fn run_hook<F>(plugin: &mut dyn Plugin, ctx: &HookContext<'_>, hook: &mut F, first: &mut Result<()>)
where
    F: FnMut(&mut dyn Plugin, &HookContext<'_>) -> Result<()>,
{
    if let Err(e) = hook(&mut *plugin, ctx) {
        tracing::warn!(
            plugin = plugin.name(),
            stage = %ctx.stage,
            subscriber = %ctx.subscriber,
            error = %e,
            "plugin hook failed"
        );
        if first.is_ok() {
            *first = Err(e);
        }
    }
}

/// The engine handle.
///
/// Provides a unified interface for:
/// - Receiving before/after lifecycle notifications from the instrumentation layer
/// - Looking up the live state of a stage or subscription
/// - Building snapshots of the inferred graph
/// - Flushing terminal stages and old values
///
/// A single lock is held for the duration of each notification and each
/// snapshot build, so a `Spy` can be shared across threads. Hooks never panic
/// and never fail the host pipeline: every error they return has already
/// been logged and can be ignored.
pub struct Spy {
    /// Spy configuration.
    config: SpyConfig,

    /// Logical clock shared with the correlator.
    clock: Arc<TickClock>,

    state: Mutex<SpyState>,
}

impl Spy {
    /// Create a spy with the default configuration.
    pub fn new(resolver: Arc<dyn StageResolver>) -> Self {
        Self::build(SpyConfig::default(), resolver)
    }

    /// Create a spy, validating the configuration first.
    pub fn with_config(config: SpyConfig, resolver: Arc<dyn StageResolver>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, resolver))
    }

    fn build(config: SpyConfig, resolver: Arc<dyn StageResolver>) -> Self {
        let clock = Arc::new(TickClock::new());
        let correlator = EventCorrelator::new(&config, Arc::clone(&clock), resolver);

        Self {
            config,
            clock,
            state: Mutex::new(SpyState {
                correlator,
                stats: StatsPlugin::new(),
                plugins: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &SpyConfig {
        &self.config
    }

    /// Latest tick issued.
    pub fn tick(&self) -> Tick {
        self.clock.current()
    }

    // --- Plugins ---

    /// Add a plugin. It sees every notification delivered from now on.
    pub fn plug(&self, plugin: Box<dyn Plugin>) {
        tracing::debug!(plugin = plugin.name(), "plugging");
        self.state.lock().plugins.push(plugin);
    }

    /// Remove the first plugin with the given name.
    pub fn unplug(&self, name: &str) -> Result<Box<dyn Plugin>> {
        let mut state = self.state.lock();
        let index = state
            .plugins
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| SpyError::PluginNotFound(name.to_string()))?;
        let mut plugin = state.plugins.remove(index);
        plugin.teardown();
        tracing::debug!(plugin = name, "unplugged");
        Ok(plugin)
    }

    /// Drop all tracked state and plugins. The spy stays usable.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        for plugin in &mut state.plugins {
            plugin.teardown();
        }
        state.plugins.clear();
        state.stats.teardown();
        state.correlator.reset();
    }

    // --- Notifications ---

    /// A subscriber is about to subscribe to a stage.
    ///
    /// The recorded call site is the caller's, or the first caller above a
    /// chain of `#[track_caller]` functions.
    #[track_caller]
    pub fn before_subscribe(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let call_site = if self.config.capture_call_sites {
            Some(CallSite::capture())
        } else {
            None
        };

        let mut state = self.state.lock();
        let tracked = state
            .correlator
            .before_subscribe(stage, subscriber, call_site);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.before_subscribe(ctx));
        tracked.and(plugins)
    }

    pub fn after_subscribe(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.after_subscribe(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.after_subscribe(ctx));
        tracked.and(plugins)
    }

    pub fn before_next(
        &self,
        stage: StageId,
        subscriber: SubscriberId,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state
            .correlator
            .before_next(stage, subscriber, value.clone());
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.before_next(ctx, &value));
        tracked.and(plugins)
    }

    pub fn after_next(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.after_next(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.after_next(ctx));
        tracked.and(plugins)
    }

    pub fn before_complete(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.before_complete(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.before_complete(ctx));
        tracked.and(plugins)
    }

    pub fn after_complete(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.after_complete(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.after_complete(ctx));
        tracked.and(plugins)
    }

    pub fn before_error(
        &self,
        stage: StageId,
        subscriber: SubscriberId,
        error: &serde_json::Value,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.before_error(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.before_error(ctx, error));
        tracked.and(plugins)
    }

    pub fn after_error(
        &self,
        stage: StageId,
        subscriber: SubscriberId,
        error: serde_json::Value,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state
            .correlator
            .after_error(stage, subscriber, error.clone());
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.after_error(ctx, &error));
        tracked.and(plugins)
    }

    pub fn before_unsubscribe(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.before_unsubscribe(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.before_unsubscribe(ctx));
        tracked.and(plugins)
    }

    pub fn after_unsubscribe(&self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let mut state = self.state.lock();
        let tracked = state.correlator.after_unsubscribe(stage, subscriber);
        let plugins = state.dispatch(stage, subscriber, |p, ctx| p.after_unsubscribe(ctx));
        tracked.and(plugins)
    }

    // --- Read API ---

    /// Copy of the live node for a stage.
    pub fn peek_at_node(&self, stage: StageId) -> Option<GraphNode> {
        self.state.lock().correlator.registry().lookup(stage).cloned()
    }

    /// Copy of the live record for a subscriber on a stage.
    pub fn peek_at_subscription(
        &self,
        stage: StageId,
        subscriber: SubscriberId,
    ) -> Option<SubscriptionRecord> {
        self.state
            .lock()
            .correlator
            .registry()
            .lookup_subscription(stage, subscriber)
            .cloned()
    }

    /// Number of tracked stages.
    pub fn node_count(&self) -> usize {
        self.state.lock().correlator.registry().len()
    }

    /// Current nesting depth of in-flight notifications.
    pub fn depth(&self) -> usize {
        self.state.lock().correlator.depth()
    }

    /// Build a snapshot of the tracked graph.
    pub fn snapshot(&self, options: SnapshotOptions<'_>) -> Snapshot {
        let state = self.state.lock();
        build_snapshot(state.correlator.registry(), self.clock.current(), &options)
    }

    /// Apply the retention policy with the configured `kept_values`.
    pub fn flush(&self, options: FlushOptions) -> FlushSummary {
        let mut state = self.state.lock();
        retention::flush(
            state.correlator.registry_mut(),
            options,
            self.config.kept_values,
        )
    }

    pub fn stats(&self) -> Stats {
        self.state.lock().stats.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StageTable;
    use serde_json::json;

    struct Failing;

    impl Plugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn before_next(&mut self, ctx: &HookContext<'_>, _value: &serde_json::Value) -> Result<()> {
            Err(SpyError::StageNotFound(ctx.stage))
        }
    }

    fn spy() -> Spy {
        Spy::new(Arc::new(StageTable::new()))
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = Spy::with_config(
            SpyConfig::default().with_kept_values(0),
            Arc::new(StageTable::new()),
        );
        assert!(matches!(result, Err(SpyError::InvalidConfig(_))));
    }

    #[test]
    fn test_call_site_points_at_caller() {
        let spy = spy();
        let line = line!() + 1;
        spy.before_subscribe(StageId(1), SubscriberId(1)).unwrap();

        let record = spy.peek_at_subscription(StageId(1), SubscriberId(1)).unwrap();
        let site = record.call_site.unwrap();
        assert_eq!(site.line, line);
        assert!(site.file.ends_with("spy.rs"));
    }

    #[test]
    fn test_plugin_error_is_returned_after_tracking() {
        let spy = spy();
        spy.plug(Box::new(Failing));
        spy.before_subscribe(StageId(1), SubscriberId(1)).unwrap();
        spy.after_subscribe(StageId(1), SubscriberId(1)).unwrap();

        let result = spy.before_next(StageId(1), SubscriberId(1), json!(1));
        assert!(result.is_err());
        spy.after_next(StageId(1), SubscriberId(1)).unwrap();

        let record = spy.peek_at_subscription(StageId(1), SubscriberId(1)).unwrap();
        assert_eq!(record.values.len(), 1);
        assert_eq!(spy.stats().nexts, 1);
    }

    #[test]
    fn test_unplug_unknown_plugin() {
        let spy = spy();
        assert!(matches!(
            spy.unplug("missing"),
            Err(SpyError::PluginNotFound(_))
        ));
        spy.plug(Box::new(Failing));
        assert_eq!(spy.unplug("failing").unwrap().name(), "failing");
    }

    #[test]
    fn test_teardown_clears_graph() {
        let spy = spy();
        spy.before_subscribe(StageId(1), SubscriberId(1)).unwrap();
        spy.teardown();

        assert_eq!(spy.node_count(), 0);
        assert_eq!(spy.depth(), 0);
        assert_eq!(spy.stats(), Stats::default());
    }
}

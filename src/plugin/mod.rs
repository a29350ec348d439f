//! Plugins observing the notification stream alongside the graph tracker.
//!
//! Every hook receives a [`HookContext`] with a read-only view of the graph
//! as the tracker left it for that notification. Hooks run while the spy's
//! lock is held, so a plugin must never call back into its [`Spy`](crate::Spy).

mod stats;

pub use stats::{Stats, StatsPlugin};

use crate::error::Result;
use crate::registry::NodeRegistry;
use crate::types::{StageId, SubscriberId, Tick};

/// What a hook is being told about.
#[derive(Clone, Copy)]
pub struct HookContext<'a> {
    pub stage: StageId,
    pub subscriber: SubscriberId,
    /// The tracked graph after the tracker handled this notification.
    pub graph: &'a NodeRegistry,
    pub tick: Tick,
    /// Notifications still in flight around this one. Zero for a top-level call.
    pub depth: usize,
}

/// Receiver of lifecycle notifications.
///
/// All hooks default to doing nothing. Errors are logged by the spy and
/// returned to the instrumentation layer; they never stop other plugins.
#[allow(unused_variables)]
pub trait Plugin: Send {
    /// Name used by [`Spy::unplug`](crate::Spy::unplug).
    fn name(&self) -> &str;

    fn before_subscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn after_subscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn before_next(&mut self, ctx: &HookContext<'_>, value: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn after_next(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn before_complete(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn after_complete(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn before_error(&mut self, ctx: &HookContext<'_>, error: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn after_error(&mut self, ctx: &HookContext<'_>, error: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn before_unsubscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    fn after_unsubscribe(&mut self, ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called when the plugin is unplugged or the spy is torn down.
    fn teardown(&mut self) {}
}

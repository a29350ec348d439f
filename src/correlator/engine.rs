//! Infers graph structure from the nesting of lifecycle notifications.

use super::stack::{CallStack, Popped, StackEntry};
use crate::config::SpyConfig;
use crate::error::{Result, SpyError};
use crate::registry::{GraphNode, NodeRegistry, SubscriptionRecord};
use crate::resolver::StageResolver;
use crate::tick::TickClock;
use crate::types::{CallSite, Notification, StageId, SubscriberId};
use std::sync::Arc;

/// Turns an ordered stream of before/after notifications into graph updates.
///
/// A subscribe nested directly inside a next is a merge of the value's stage.
/// Otherwise a subscribe nested anywhere inside another subscribe is a
/// dependency of the nearest enclosing one. Anything else is an explicit,
/// root subscription.
pub struct EventCorrelator {
    registry: NodeRegistry,
    stack: CallStack,
    clock: Arc<TickClock>,
    resolver: Arc<dyn StageResolver>,
    warn_on_unknown_stage: bool,
}

impl EventCorrelator {
    pub fn new(config: &SpyConfig, clock: Arc<TickClock>, resolver: Arc<dyn StageResolver>) -> Self {
        Self {
            registry: NodeRegistry::new(),
            stack: CallStack::new(config.max_stack_depth),
            clock,
            resolver,
            warn_on_unknown_stage: config.warn_on_unknown_stage,
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// Current nesting depth of in-flight notifications.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Drop all tracked state.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.stack.clear();
    }

    // --- Before hooks ---

    pub fn before_subscribe(
        &mut self,
        stage: StageId,
        subscriber: SubscriberId,
        call_site: Option<CallSite>,
    ) -> Result<()> {
        let tick = self.clock.advance();
        let resolver = &self.resolver;
        let (node, created) = self.registry.get_or_create(stage, || {
            GraphNode::new(
                stage,
                resolver.resolve_type(stage),
                resolver.resolve_tag(stage),
                tick,
            )
        });
        if !created {
            node.touch(tick);
        }

        // Once pushes are absorbed the stored top is no longer the innermost
        // call, so no edge can be trusted. The subscribe is still nested.
        let mut explicit = true;
        match self.stack.top() {
            _ if self.stack.is_overflowing() => explicit = false,
            Some(top) if top.notification == Notification::Next => {
                explicit = false;
                if let Some(source) = top.stage {
                    self.registry.add_merge(source, stage, tick);
                }
            }
            _ => {
                if let Some(enclosing) = self.stack.nearest(Notification::Subscribe) {
                    explicit = false;
                    if let Some(dependent) = enclosing.stage {
                        self.registry.add_dependency(dependent, stage, tick);
                    }
                }
            }
        }

        let record = SubscriptionRecord::new(subscriber, explicit, call_site);
        if let Some(node) = self.registry.lookup_mut(stage) {
            match node.subscription_mut(subscriber) {
                Some(existing) => *existing = record,
                None => node.subscriptions.push(record),
            }
        }

        tracing::trace!(%stage, %subscriber, explicit, "before subscribe");
        self.push(StackEntry {
            notification: Notification::Subscribe,
            stage: Some(stage),
            subscriber: Some(subscriber),
        })
    }

    pub fn before_next(
        &mut self,
        stage: StageId,
        subscriber: SubscriberId,
        value: serde_json::Value,
    ) -> Result<()> {
        let entry = self.resolve(Notification::Next, stage, subscriber);
        let pushed = self.push(entry);

        let Some(stage) = entry.stage else {
            return pushed.and(Err(SpyError::StageNotFound(stage)));
        };
        let tick = self.clock.advance();
        let Some(node) = self.registry.lookup_mut(stage) else {
            return pushed;
        };
        node.touch(tick);
        match node.subscription_mut(subscriber) {
            Some(record) => {
                record.record_value(value);
                pushed
            }
            None => {
                tracing::debug!(%stage, %subscriber, "value for an unknown subscription dropped");
                pushed.and(Err(SpyError::SubscriptionNotFound { stage, subscriber }))
            }
        }
    }

    pub fn before_complete(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        self.push_resolved(Notification::Complete, stage, subscriber)
    }

    pub fn before_error(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        self.push_resolved(Notification::Error, stage, subscriber)
    }

    pub fn before_unsubscribe(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        self.push_resolved(Notification::Unsubscribe, stage, subscriber)
    }

    // --- After hooks ---

    pub fn after_subscribe(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        self.pop(Notification::Subscribe, stage, subscriber).map(|_| ())
    }

    pub fn after_next(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        self.pop(Notification::Next, stage, subscriber).map(|_| ())
    }

    pub fn after_complete(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let Some(stage) = self.pop(Notification::Complete, stage, subscriber)? else {
            return Ok(());
        };
        let tick = self.clock.advance();
        if let Some(node) = self.registry.lookup_mut(stage) {
            node.mark_complete(tick);
        }
        Ok(())
    }

    pub fn after_error(
        &mut self,
        stage: StageId,
        subscriber: SubscriberId,
        error: serde_json::Value,
    ) -> Result<()> {
        let Some(stage) = self.pop(Notification::Error, stage, subscriber)? else {
            return Ok(());
        };
        let tick = self.clock.advance();
        if let Some(node) = self.registry.lookup_mut(stage) {
            node.mark_error(error, tick);
        }
        Ok(())
    }

    pub fn after_unsubscribe(&mut self, stage: StageId, subscriber: SubscriberId) -> Result<()> {
        let Some(stage) = self.pop(Notification::Unsubscribe, stage, subscriber)? else {
            return Ok(());
        };
        let tick = self.clock.advance();
        if let Some(node) = self.registry.lookup_mut(stage) {
            if node.remove_subscription(subscriber).is_some() {
                node.touch(tick);
            }
        }
        Ok(())
    }

    // --- Internals ---

    /// Build a stack entry for a stage that should already be tracked.
    fn resolve(
        &self,
        notification: Notification,
        stage: StageId,
        subscriber: SubscriberId,
    ) -> StackEntry {
        let tracked = self.registry.contains(stage);
        if !tracked && self.warn_on_unknown_stage {
            tracing::warn!(
                %stage,
                %notification,
                "stage not tracked; subscriptions made before the spy attached are not snapshotted"
            );
        }
        StackEntry {
            notification,
            stage: tracked.then_some(stage),
            subscriber: Some(subscriber),
        }
    }

    fn push_resolved(
        &mut self,
        notification: Notification,
        stage: StageId,
        subscriber: SubscriberId,
    ) -> Result<()> {
        let entry = self.resolve(notification, stage, subscriber);
        self.push(entry)?;
        match entry.stage {
            Some(_) => Ok(()),
            None => Err(SpyError::StageNotFound(stage)),
        }
    }

    fn push(&mut self, entry: StackEntry) -> Result<()> {
        if self.stack.push(entry) {
            return Ok(());
        }
        let depth = self.stack.depth();
        tracing::warn!(
            depth,
            notification = %entry.notification,
            "notification stack full; nested structure will not be inferred"
        );
        Err(SpyError::StackOverflow(depth))
    }

    /// Pop the entry opened by the matching before hook.
    ///
    /// Returns the tracked stage the entry refers to, if any. Entries absorbed
    /// by a stack overflow fall back to the stage named by the after hook.
    fn pop(
        &mut self,
        expected: Notification,
        stage: StageId,
        subscriber: SubscriberId,
    ) -> Result<Option<StageId>> {
        match self.stack.pop() {
            Popped::Entry(entry) => {
                if entry.notification != expected || entry.stage.is_some_and(|s| s != stage) {
                    tracing::warn!(
                        %expected,
                        found = %entry.notification,
                        %stage,
                        %subscriber,
                        "after notification does not match the innermost before notification"
                    );
                }
                Ok(entry.stage)
            }
            Popped::Absorbed => Ok(self.registry.contains(stage).then_some(stage)),
            Popped::Empty => {
                tracing::warn!(%expected, %stage, %subscriber, "after notification with empty stack");
                Err(SpyError::UnbalancedNotification {
                    expected,
                    found: "an empty stack".to_string(),
                })
            }
        }
    }
}

//! Graph node and subscription record types.

use crate::types::{CallSite, StageId, SubscriberId, Tick, TimedValue, Timestamp};
use serde::{Deserialize, Serialize};

/// Live state of one subscriber attached to a stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub subscriber: SubscriberId,

    /// True if the subscription was not nested inside another subscribe or a next.
    pub explicit: bool,

    /// Time of the latest value, or of the subscribe if none arrived yet.
    pub timestamp: Timestamp,

    /// Recent values, oldest first.
    pub values: Vec<TimedValue>,

    /// Values trimmed away by retention.
    pub values_flushed: usize,

    /// Where the subscription was made, if captured.
    pub call_site: Option<CallSite>,
}

impl SubscriptionRecord {
    pub fn new(subscriber: SubscriberId, explicit: bool, call_site: Option<CallSite>) -> Self {
        Self {
            subscriber,
            explicit,
            timestamp: Timestamp::now(),
            values: Vec::new(),
            values_flushed: 0,
            call_site,
        }
    }

    /// Record a delivered value.
    pub fn record_value(&mut self, value: serde_json::Value) {
        let timestamp = Timestamp::now();
        self.timestamp = timestamp;
        self.values.push(TimedValue { timestamp, value });
    }

    /// Total values ever seen on this subscription.
    pub fn values_seen(&self) -> usize {
        self.values_flushed + self.values.len()
    }

    /// Drop all but the `kept` most recent values. Returns the number dropped.
    pub fn trim_values(&mut self, kept: usize) -> usize {
        let excess = self.values.len().saturating_sub(kept);
        if excess > 0 {
            self.values.drain(..excess);
            self.values_flushed += excess;
        }
        excess
    }
}

/// Aggregated lifetime state of one pipeline stage.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub stage: StageId,
    pub tag: Option<String>,
    pub type_name: String,
    pub tick: Tick,
    pub complete: bool,
    pub error: Option<serde_json::Value>,

    /// Stages this one subscribed to during its own subscribe.
    pub dependencies: Vec<StageId>,
    /// Inverse of `dependencies`.
    pub dependents: Vec<StageId>,
    /// Stages subscribed to while one of this stage's values was delivered.
    pub merges: Vec<StageId>,

    pub subscriptions: Vec<SubscriptionRecord>,
}

impl GraphNode {
    pub fn new(stage: StageId, type_name: String, tag: Option<String>, tick: Tick) -> Self {
        Self {
            stage,
            tag,
            type_name,
            tick,
            complete: false,
            error: None,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            merges: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Completed or errored. No further events can arrive.
    pub fn is_terminal(&self) -> bool {
        self.complete || self.error.is_some()
    }

    pub fn subscription(&self, subscriber: SubscriberId) -> Option<&SubscriptionRecord> {
        self.subscriptions.iter().find(|s| s.subscriber == subscriber)
    }

    pub fn subscription_mut(&mut self, subscriber: SubscriberId) -> Option<&mut SubscriptionRecord> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.subscriber == subscriber)
    }

    /// Stamp a mutation. Ticks never move backwards.
    pub fn touch(&mut self, tick: Tick) {
        if tick > self.tick {
            self.tick = tick;
        }
    }

    /// Mark the stage complete. Returns false if it was already terminal.
    pub fn mark_complete(&mut self, tick: Tick) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.complete = true;
        self.subscriptions.clear();
        self.touch(tick);
        true
    }

    /// Record the stage's error. Returns false if it was already terminal.
    pub fn mark_error(&mut self, error: serde_json::Value, tick: Tick) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.error = Some(error);
        self.subscriptions.clear();
        self.touch(tick);
        true
    }

    /// Remove a subscriber's record. Returns it if present.
    pub fn remove_subscription(&mut self, subscriber: SubscriberId) -> Option<SubscriptionRecord> {
        let index = self
            .subscriptions
            .iter()
            .position(|s| s.subscriber == subscriber)?;
        Some(self.subscriptions.remove(index))
    }
}

/// Push `id` unless already present. Returns true if it was added.
pub(crate) fn add_once(set: &mut Vec<StageId>, id: StageId) -> bool {
    if set.contains(&id) {
        false
    } else {
        set.push(id);
        true
    }
}

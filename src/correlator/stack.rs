//! Bounded stack of in-flight notifications.

use crate::types::{Notification, StageId, SubscriberId};

/// One in-flight notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackEntry {
    pub notification: Notification,
    /// `None` when the stage was not tracked when the notification arrived.
    pub stage: Option<StageId>,
    pub subscriber: Option<SubscriberId>,
}

/// Result of popping the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Popped {
    Entry(StackEntry),
    /// The matching push was dropped because the stack was full.
    Absorbed,
    Empty,
}

/// LIFO stack mirroring the nesting of notification calls.
///
/// Pushes past `max_depth` are counted instead of stored, and the same number
/// of pops are absorbed before real entries are popped again.
#[derive(Debug)]
pub struct CallStack {
    entries: Vec<StackEntry>,
    max_depth: usize,
    overflow: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_depth.min(64)),
            max_depth,
            overflow: 0,
        }
    }

    /// Push an entry. Returns false if the stack is full and the entry was dropped.
    pub fn push(&mut self, entry: StackEntry) -> bool {
        if self.entries.len() >= self.max_depth {
            self.overflow += 1;
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn pop(&mut self) -> Popped {
        if self.overflow > 0 {
            self.overflow -= 1;
            return Popped::Absorbed;
        }
        match self.entries.pop() {
            Some(entry) => Popped::Entry(entry),
            None => Popped::Empty,
        }
    }

    pub fn top(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    /// Nearest entry of the given kind, scanning from the top down.
    pub fn nearest(&self, notification: Notification) -> Option<&StackEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.notification == notification)
    }

    pub fn depth(&self) -> usize {
        self.entries.len() + self.overflow
    }

    /// True while pushes are being absorbed instead of stored.
    pub fn is_overflowing(&self) -> bool {
        self.overflow > 0
    }

    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.overflow = 0;
    }
}

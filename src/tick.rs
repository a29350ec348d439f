//! Logical clock shared by everything attached to one spy.

use crate::types::Tick;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic tick source.
///
/// Owned by a [`Spy`](crate::Spy) and shared with its plugins through an
/// `Arc`; two spies never share a clock.
#[derive(Debug, Default)]
pub struct TickClock {
    current: AtomicU64,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock and return the new tick.
    pub fn advance(&self) -> Tick {
        Tick(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Read the latest tick without advancing.
    pub fn current(&self) -> Tick {
        Tick(self.current.load(Ordering::SeqCst))
    }
}

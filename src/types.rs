//! Core types for the pipeline spy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a pipeline stage, supplied by the instrumentation layer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId(pub u64);

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageId({})", self.0)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a subscriber attached to a stage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical version stamp. Only ever moves forward.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub fn next(self) -> Self {
        Tick(self.0 + 1)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. Clocks set before the epoch read as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0);
        Timestamp(micros)
    }

    /// Microseconds elapsed from `earlier` to `self`, never negative.
    pub fn micros_since(self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Lifecycle notification kinds delivered by the instrumentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    Subscribe,
    Next,
    Error,
    Complete,
    Unsubscribe,
}

impl Notification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notification::Subscribe => "subscribe",
            Notification::Next => "next",
            Notification::Error => "error",
            Notification::Complete => "complete",
            Notification::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source location where a subscription was made.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl CallSite {
    /// Captures the caller's location, following `#[track_caller]` frames.
    #[track_caller]
    pub fn capture() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&Location<'_>> for CallSite {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A value delivered on a subscription, stamped with its arrival time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimedValue {
    pub timestamp: Timestamp,
    pub value: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_ordering() {
        let tick = Tick(5);
        assert_eq!(tick.next(), Tick(6));
        assert!(Tick::ZERO < tick);
    }

    #[test]
    fn test_notification_names() {
        assert_eq!(Notification::Subscribe.to_string(), "subscribe");
        assert_eq!(
            serde_json::to_string(&Notification::Unsubscribe).unwrap(),
            "\"unsubscribe\""
        );
    }

    #[test]
    fn test_call_site_follows_track_caller() {
        #[track_caller]
        fn instrumented() -> CallSite {
            CallSite::capture()
        }

        let expected_line = line!() + 1;
        let site = instrumented();
        assert_eq!(site.line, expected_line);
        assert!(site.file.ends_with("types.rs"));
    }

    #[test]
    fn test_timestamp_elapsed_is_non_negative() {
        assert_eq!(Timestamp(10).micros_since(Timestamp(4)), 6);
        assert_eq!(Timestamp(4).micros_since(Timestamp(10)), 0);
    }
}

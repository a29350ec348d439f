//! # Pipeline Spy
//!
//! Runtime dependency-graph tracking for reactive stream pipelines. An
//! instrumentation layer reports every lifecycle call of every stage; the spy
//! reconstructs who subscribed to whom without the pipeline declaring it.
//!
//! ## Core Concepts
//!
//! - **Nodes**: one per pipeline stage, aggregating its subscriptions and values
//! - **Correlation**: parent/child and merge edges inferred from call nesting
//! - **Snapshots**: independent, self-consistent copies of the graph
//! - **Retention**: flushing terminal stages and trimming old values
//!
//! ## Example
//!
//! ```ignore
//! use pipespy::{Spy, StageId, StageTable, SubscriberId, SnapshotOptions};
//!
//! let stages = Arc::new(StageTable::new());
//! stages.register(StageId(1), "MapOperator", Some("people"));
//! let spy = Spy::new(stages);
//!
//! spy.before_subscribe(StageId(1), SubscriberId(10))?;
//! spy.before_subscribe(StageId(2), SubscriberId(11))?; // nested: a dependency
//! spy.after_subscribe(StageId(2), SubscriberId(11))?;
//! spy.after_subscribe(StageId(1), SubscriberId(10))?;
//!
//! let snapshot = spy.snapshot(SnapshotOptions::new());
//! ```

pub mod config;
pub mod correlator;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod retention;
pub mod snapshot;
pub mod spy;
pub mod tick;
pub mod types;

// Re-exports
pub use config::SpyConfig;
pub use correlator::{CallStack, EventCorrelator, StackEntry};
pub use error::{Result, SpyError};
pub use plugin::{HookContext, Plugin, Stats, StatsPlugin};
pub use registry::{GraphNode, NodeRegistry, SubscriptionRecord};
pub use resolver::{StageResolver, StageTable};
pub use retention::{FlushOptions, FlushSummary};
pub use snapshot::{build_snapshot, NodeIndex, Snapshot, SnapshotNode, SnapshotOptions};
pub use spy::Spy;
pub use tick::TickClock;
pub use types::*;

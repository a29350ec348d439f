//! Event correlation for lifecycle notifications.
//!
//! The instrumentation layer reports every subscribe, next, error, complete
//! and unsubscribe twice: once before the pipeline handles it and once after.
//! Because those calls nest exactly like the pipeline's own call stack, an
//! explicit stack of in-flight notifications is enough to tell which stage
//! caused which subscription:
//!
//! - subscribe directly inside a next: the stage is a *merge* of the value's stage
//! - subscribe inside a subscribe: the stage is a *dependency* of the outer one
//! - anything else: an *explicit* root subscription

mod engine;
mod stack;

pub use engine::EventCorrelator;
pub use stack::{CallStack, Popped, StackEntry};

//! Tributary Runtime
//!
//! Turns a compiled pipeline into work: per-resource stage chains
//! (fetch, validate, transform, publish, load), summary queries, a
//! dependency-driven scheduler and a concurrent run engine with bounded
//! retries and cooperative cancellation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod context;
pub mod engine;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod summary;
pub mod transform;

#[cfg(test)]
mod testing;

pub use chain::{ChainReport, ResourceChain};
pub use context::RunContext;
pub use engine::{Engine, EngineConfig, NodeOutcome, NodeSummary, RunReport, RunStatus};
pub use pipeline::{Pipeline, Task};
pub use retry::RetryPolicy;
pub use scheduler::{NodeState, ScheduleDecision, Scheduler};
pub use summary::SummaryTask;
pub use transform::{ColumnTransform, Transform};

// Re-exported for callers that drive cancellation themselves
pub use tokio_util::sync::CancellationToken;

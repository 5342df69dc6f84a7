//! Tributary Planner
//!
//! Reads a pipeline configuration and expands it into a typed dependency
//! graph: one chain node per resource, one aggregation node per summary,
//! and an edge from every declared dependency into its summary. The graph
//! is built and validated once, before anything runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod config;
pub mod graph;
pub mod validate;

pub use builder::{BuildOutput, BuildWarning, GraphBuilder};
pub use config::{ColumnDef, PipelineConfig, ResourceConfig, SummaryConfig, TransformDef};
pub use graph::{Edge, Node, NodeKind, PipelineGraph, StageKind};
pub use validate::validate;

//! A pipeline ready to run: validated graph plus one compiled task per
//! node.

use crate::chain::ResourceChain;
use crate::summary::SummaryTask;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{info, warn};
use tributary_core::{CoreError, CoreResult, NodeId};
use tributary_plan::{BuildWarning, GraphBuilder, NodeKind, PipelineConfig, PipelineGraph};

/// Work attached to a graph node
#[derive(Debug, Clone)]
pub enum Task {
    /// Resource stage chain
    Chain(Arc<ResourceChain>),
    /// Summary query
    Summary(Arc<SummaryTask>),
}

/// Compiled pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    graph: PipelineGraph,
    tasks: IndexMap<NodeId, Task>,
    warnings: Vec<BuildWarning>,
}

impl Pipeline {
    /// Check the configuration, build the graph and compile every node.
    ///
    /// Nothing is fetched or written; every configuration error surfaces
    /// here.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found
    pub fn prepare(config: &PipelineConfig) -> CoreResult<Self> {
        config.check()?;
        let output = GraphBuilder::new().build_config(config)?;

        let mut tasks = IndexMap::new();
        for node in output.graph.nodes() {
            let task = match &node.kind {
                NodeKind::Chain { resource, .. } => {
                    let resource_config = config.resources.get(resource).ok_or_else(|| {
                        CoreError::NotFound {
                            kind: "resource".to_string(),
                            id: resource.clone(),
                        }
                    })?;
                    Task::Chain(Arc::new(ResourceChain::compile(resource, resource_config)?))
                }
                NodeKind::Summary {
                    summary,
                    definition,
                    table,
                } => Task::Summary(Arc::new(SummaryTask::load(summary, definition, table)?)),
            };
            tasks.insert(node.id, task);
        }

        for warning in &output.warnings {
            warn!("{}", warning);
        }
        info!(
            nodes = output.graph.node_count(),
            edges = output.graph.edge_count(),
            "Prepared pipeline"
        );

        Ok(Self {
            graph: output.graph,
            tasks,
            warnings: output.warnings,
        })
    }

    /// Cap every resource's fetch at `max_items`
    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        for task in self.tasks.values_mut() {
            if let Task::Chain(chain) = task {
                *chain = Arc::new(chain.as_ref().clone().with_max_items(max_items));
            }
        }
        self
    }

    /// Dependency graph
    #[must_use]
    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Build warnings
    #[must_use]
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Task of a node
    #[must_use]
    pub fn task(&self, id: NodeId) -> Option<&Task> {
        self.tasks.get(&id)
    }
}

//! Run engine for compiled pipelines.
//!
//! Combines the scheduler with a tokio `JoinSet`: every ready node is
//! spawned at once (up to `max_parallel`), and each finished node may
//! release its dependents. Failures stay local to their downstream
//! subgraph; cancellation stops new work and lets running nodes wind down
//! at their next checkpoint.

use crate::chain::ChainReport;
use crate::context::RunContext;
use crate::pipeline::{Pipeline, Task};
use crate::retry::RetryPolicy;
use crate::scheduler::Scheduler;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tributary_core::{CoreError, CoreResult, NodeId, RunId};

/// Default cap on concurrently running nodes
pub const DEFAULT_MAX_PARALLEL: usize = 16;

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Retry policy applied to every stage
    pub retry: RetryPolicy,
    /// Maximum nodes running at once
    pub max_parallel: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl EngineConfig {
    /// Set the retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the parallelism cap; values below 1 are treated as 1
    #[must_use]
    pub const fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = if max_parallel == 0 { 1 } else { max_parallel };
        self
    }
}

/// What a successful node produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSummary {
    /// Resource chain report
    Chain(ChainReport),
    /// Summary destination
    Summary {
        /// Fully qualified table id
        table_id: String,
    },
}

/// Final state of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Finished successfully
    Succeeded(NodeSummary),
    /// Failed after retries
    Failed {
        /// Error message
        error: String,
    },
    /// Never ran, or stopped by cancellation
    Skipped {
        /// Why
        reason: String,
    },
}

/// Overall run result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every node succeeded
    Success,
    /// Some nodes failed or were skipped
    PartialFailure,
    /// The run was cancelled
    Cancelled,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run id
    pub run_id: RunId,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last node finished
    pub finished_at: DateTime<Utc>,
    /// Whether cancellation was requested
    pub cancelled: bool,
    /// Outcome per node, in declaration order
    pub nodes: IndexMap<String, NodeOutcome>,
}

impl RunReport {
    /// Whether every node succeeded
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.nodes
            .values()
            .all(|o| matches!(o, NodeOutcome::Succeeded(_)))
    }

    /// Names of failed nodes
    #[must_use]
    pub fn failed_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, o)| matches!(o, NodeOutcome::Failed { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of skipped nodes
    #[must_use]
    pub fn skipped_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, o)| matches!(o, NodeOutcome::Skipped { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Overall status
    #[must_use]
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Cancelled
        } else if self.succeeded() {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        }
    }
}

/// Runs pipelines against one context
#[derive(Debug, Clone)]
pub struct Engine {
    ctx: RunContext,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine
    #[must_use]
    pub fn new(ctx: RunContext, config: EngineConfig) -> Self {
        Self { ctx, config }
    }

    /// Run context
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Run every node of `pipeline` to completion.
    ///
    /// Node failures are reported in the [`RunReport`], not returned.
    ///
    /// # Errors
    ///
    /// Returns an internal error only if the scheduler and the task set
    /// disagree
    pub async fn run(&self, pipeline: &Pipeline) -> CoreResult<RunReport> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let graph = pipeline.graph();
        let name_of = |id: NodeId| {
            graph
                .node(id)
                .map_or_else(|| id.to_string(), |n| n.name.clone())
        };

        info!(run_id = %run_id, nodes = graph.node_count(), "Starting run");

        let mut scheduler = Scheduler::from_graph(graph);
        let mut outcomes: IndexMap<NodeId, NodeOutcome> = IndexMap::new();
        let mut running: JoinSet<(NodeId, CoreResult<NodeSummary>)> = JoinSet::new();

        loop {
            if self.ctx.cancel().is_cancelled() {
                for id in scheduler.skip_unstarted() {
                    outcomes.insert(id, skipped("run cancelled"));
                }
            } else {
                while running.len() < self.config.max_parallel {
                    let Some(id) = scheduler.start_next() else {
                        break;
                    };
                    let task = pipeline.task(id).cloned().ok_or_else(|| CoreError::Internal {
                        message: format!("no task for {}", name_of(id)),
                    })?;
                    info!(node = %name_of(id), "Starting node");
                    running.spawn(run_task(id, task, self.ctx.clone(), self.config.retry));
                }
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (id, result) = match joined {
                Ok(done) => done,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => {
                    return Err(CoreError::Internal {
                        message: format!("node task aborted: {}", err),
                    });
                }
            };

            let name = name_of(id);
            match result {
                Ok(summary) => {
                    info!(node = %name, "Node succeeded");
                    scheduler.mark_complete(id)?;
                    outcomes.insert(id, NodeOutcome::Succeeded(summary));
                }
                Err(CoreError::Cancelled) => {
                    warn!(node = %name, "Node cancelled");
                    scheduler.mark_skipped(id)?;
                    outcomes.insert(id, skipped("run cancelled"));
                }
                Err(err) => {
                    error!(node = %name, error = %err, "Node failed");
                    for dependent in scheduler.mark_failed(id)? {
                        warn!(node = %name_of(dependent), upstream = %name, "Skipping node");
                        outcomes.insert(dependent, skipped(&format!("upstream {} failed", name)));
                    }
                    outcomes.insert(id, NodeOutcome::Failed {
                        error: err.to_string(),
                    });
                }
            }
        }

        if !scheduler.is_complete() {
            return Err(CoreError::Internal {
                message: "run ended with unfinished nodes".to_string(),
            });
        }

        let nodes = graph
            .nodes()
            .map(|node| {
                let outcome = outcomes
                    .swap_remove(&node.id)
                    .unwrap_or_else(|| skipped("not run"));
                (node.name.clone(), outcome)
            })
            .collect();
        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            cancelled: self.ctx.cancel().is_cancelled(),
            nodes,
        };
        info!(
            run_id = %run_id,
            status = ?report.status(),
            failed = scheduler.failed_count(),
            skipped = scheduler.skipped_count(),
            "Run finished"
        );
        Ok(report)
    }
}

async fn run_task(
    id: NodeId,
    task: Task,
    ctx: RunContext,
    retry: RetryPolicy,
) -> (NodeId, CoreResult<NodeSummary>) {
    let result = match task {
        Task::Chain(chain) => chain.run(&ctx, &retry).await.map(NodeSummary::Chain),
        Task::Summary(summary) => summary
            .run(&ctx, &retry)
            .await
            .map(|table_id| NodeSummary::Summary { table_id }),
    };
    (id, result)
}

fn skipped(reason: &str) -> NodeOutcome {
    NodeOutcome::Skipped {
        reason: reason.to_string(),
    }
}

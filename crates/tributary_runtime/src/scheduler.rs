//! Dependency-driven scheduler for pipeline graphs.
//!
//! The scheduler owns no tasks; it only answers "what may start now":
//! - A node is ready once every dependency has completed (AND-join)
//! - Ready nodes are handed out in declaration order
//! - A failure skips every transitive dependent, and nothing else

use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;
use tributary_core::{CoreError, CoreResult, NodeId};
use tributary_plan::PipelineGraph;

/// Scheduling decision - which node to run next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Run this node next
    Run(NodeId),
    /// Wait for running nodes to finish
    Wait,
    /// Every node is finished
    Complete,
}

/// Lifecycle of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Dependencies outstanding
    Pending,
    /// May start
    Ready,
    /// Started, not finished
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Will not run
    Skipped,
}

impl NodeState {
    /// Whether the node will not change state again
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// Scheduler over one graph
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// State per node, in declaration order
    states: IndexMap<NodeId, NodeState>,
    /// Ready nodes keyed by declaration index
    ready: BTreeMap<usize, NodeId>,
    /// node -> nodes it waits on
    dependencies: IndexMap<NodeId, IndexSet<NodeId>>,
    /// node -> nodes waiting on it
    dependents: IndexMap<NodeId, IndexSet<NodeId>>,
}

impl Scheduler {
    /// Create a scheduler for every node of `graph`
    #[must_use]
    pub fn from_graph(graph: &PipelineGraph) -> Self {
        let mut scheduler = Self {
            states: IndexMap::new(),
            ready: BTreeMap::new(),
            dependencies: IndexMap::new(),
            dependents: IndexMap::new(),
        };
        for node in graph.nodes() {
            scheduler.states.insert(node.id, NodeState::Pending);
            scheduler
                .dependencies
                .insert(node.id, graph.dependencies(node.id).into_iter().collect());
            scheduler
                .dependents
                .insert(node.id, graph.dependents(node.id).into_iter().collect());
        }
        let ids: Vec<NodeId> = scheduler.states.keys().copied().collect();
        for id in ids {
            scheduler.promote(id);
        }
        scheduler
    }

    /// Move a pending node to ready if all its dependencies completed
    fn promote(&mut self, id: NodeId) {
        let Some((index, _, state)) = self.states.get_full(&id) else {
            return;
        };
        if *state != NodeState::Pending {
            return;
        }
        let satisfied = self.dependencies.get(&id).is_none_or(|deps| {
            deps.iter()
                .all(|d| self.states.get(d) == Some(&NodeState::Completed))
        });
        if satisfied {
            self.ready.insert(index, id);
            self.states.insert(id, NodeState::Ready);
        }
    }

    /// Get the next scheduling decision
    #[must_use]
    pub fn decide(&self) -> ScheduleDecision {
        if let Some(id) = self.ready.values().next() {
            ScheduleDecision::Run(*id)
        } else if self.is_complete() {
            ScheduleDecision::Complete
        } else {
            ScheduleDecision::Wait
        }
    }

    /// Take the first ready node and mark it running
    pub fn start_next(&mut self) -> Option<NodeId> {
        let (_, id) = self.ready.pop_first()?;
        self.states.insert(id, NodeState::Running);
        Some(id)
    }

    fn expect_running(&self, id: NodeId) -> CoreResult<()> {
        match self.states.get(&id) {
            Some(NodeState::Running) => Ok(()),
            Some(state) => Err(CoreError::Internal {
                message: format!("node {} finished while {:?}", id, state),
            }),
            None => Err(CoreError::NotFound {
                kind: "node".to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// Mark a running node completed; returns nodes that became ready
    ///
    /// # Errors
    ///
    /// Returns error if the node is unknown or was not running
    pub fn mark_complete(&mut self, id: NodeId) -> CoreResult<Vec<NodeId>> {
        self.expect_running(id)?;
        self.states.insert(id, NodeState::Completed);

        let dependents: Vec<NodeId> = self
            .dependents
            .get(&id)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default();
        let mut released = Vec::new();
        for dep in dependents {
            self.promote(dep);
            if self.states.get(&dep) == Some(&NodeState::Ready) {
                released.push(dep);
            }
        }
        Ok(released)
    }

    /// Mark a running node failed; returns the dependents skipped because
    /// of it
    ///
    /// # Errors
    ///
    /// Returns error if the node is unknown or was not running
    pub fn mark_failed(&mut self, id: NodeId) -> CoreResult<Vec<NodeId>> {
        self.expect_running(id)?;
        self.states.insert(id, NodeState::Failed);

        let mut skipped = Vec::new();
        let mut stack: Vec<NodeId> = self
            .dependents
            .get(&id)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if self.states.get(&next).is_some_and(|s| !s.is_finished()) {
                self.skip(next);
                skipped.push(next);
                if let Some(more) = self.dependents.get(&next) {
                    stack.extend(more.iter().copied());
                }
            }
        }
        Ok(skipped)
    }

    /// Skip every node that has not started; returns them
    pub fn skip_unstarted(&mut self) -> Vec<NodeId> {
        let unstarted: Vec<NodeId> = self
            .states
            .iter()
            .filter(|(_, s)| matches!(s, NodeState::Pending | NodeState::Ready))
            .map(|(id, _)| *id)
            .collect();
        for id in &unstarted {
            self.skip(*id);
        }
        unstarted
    }

    /// Mark a running node skipped, e.g. after cancellation
    ///
    /// # Errors
    ///
    /// Returns error if the node is unknown or was not running
    pub fn mark_skipped(&mut self, id: NodeId) -> CoreResult<()> {
        self.expect_running(id)?;
        self.skip(id);
        Ok(())
    }

    fn skip(&mut self, id: NodeId) {
        self.ready.retain(|_, r| *r != id);
        self.states.insert(id, NodeState::Skipped);
    }

    /// State of a node
    #[must_use]
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.states.get(&id).copied()
    }

    /// Get number of ready nodes
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    fn count(&self, state: NodeState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    /// Get number of running nodes
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.count(NodeState::Running)
    }

    /// Get number of completed nodes
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(NodeState::Completed)
    }

    /// Get number of failed nodes
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(NodeState::Failed)
    }

    /// Get number of skipped nodes
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(NodeState::Skipped)
    }

    /// Check if every node is finished
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.states.values().all(NodeState::is_finished)
    }

    /// Check if any node failed
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tributary_core::TableSchema;
    use tributary_plan::{GraphBuilder, ResourceConfig, SummaryConfig, TransformDef};

    fn resource(name: &str) -> ResourceConfig {
        ResourceConfig {
            endpoint: format!("https://dummyjson.com/{}", name),
            target: name.to_string(),
            destination: format!("{}.csv", name),
            spec: Default::default(),
            schema: TableSchema::default(),
            transform: TransformDef::default(),
            max_items: 0,
            page_size: 20,
        }
    }

    /// users, products, carts; user <- {users, carts}; category <- {products, carts}
    fn graph() -> PipelineGraph {
        let resources: IndexMap<_, _> = ["users", "products", "carts"]
            .iter()
            .map(|n| (n.to_string(), resource(n)))
            .collect();
        let summary = |table: &str, deps: &[&str]| SummaryConfig {
            definition: "q.sql".into(),
            table: table.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
        };
        let summaries: IndexMap<_, _> = [
            ("user".to_string(), summary("user_summary_table", &["users", "carts"])),
            ("category".to_string(), summary("category_summary_table", &["products", "carts"])),
        ]
        .into_iter()
        .collect();
        GraphBuilder::new().build(&resources, &summaries).unwrap().graph
    }

    fn id(name: &str) -> NodeId {
        NodeId::from_name(name)
    }

    #[test]
    fn test_entry_nodes_ready_in_order() {
        let mut scheduler = Scheduler::from_graph(&graph());
        assert_eq!(scheduler.ready_count(), 3);
        assert_eq!(scheduler.decide(), ScheduleDecision::Run(id("users_etl")));
        assert_eq!(scheduler.start_next(), Some(id("users_etl")));
        assert_eq!(scheduler.start_next(), Some(id("products_etl")));
        assert_eq!(scheduler.start_next(), Some(id("carts_etl")));
        assert_eq!(scheduler.decide(), ScheduleDecision::Wait);
    }

    #[test]
    fn test_and_join() {
        let mut scheduler = Scheduler::from_graph(&graph());
        while scheduler.start_next().is_some() {}

        assert!(scheduler.mark_complete(id("users_etl")).unwrap().is_empty());
        assert_eq!(scheduler.state(id("user_summary")), Some(NodeState::Pending));

        let released = scheduler.mark_complete(id("carts_etl")).unwrap();
        assert_eq!(released, vec![id("user_summary")]);
        assert_eq!(scheduler.state(id("category_summary")), Some(NodeState::Pending));
    }

    #[test]
    fn test_failure_skips_only_dependents() {
        let mut scheduler = Scheduler::from_graph(&graph());
        while scheduler.start_next().is_some() {}

        let skipped = scheduler.mark_failed(id("users_etl")).unwrap();
        assert_eq!(skipped, vec![id("user_summary")]);

        scheduler.mark_complete(id("products_etl")).unwrap();
        let released = scheduler.mark_complete(id("carts_etl")).unwrap();
        assert_eq!(released, vec![id("category_summary")]);

        assert_eq!(scheduler.start_next(), Some(id("category_summary")));
        scheduler.mark_complete(id("category_summary")).unwrap();
        assert!(scheduler.is_complete());
        assert_eq!(scheduler.completed_count(), 3);
        assert_eq!(scheduler.failed_count(), 1);
        assert_eq!(scheduler.skipped_count(), 1);
        assert_eq!(scheduler.decide(), ScheduleDecision::Complete);
    }

    #[test]
    fn test_shared_dependency_failure_skips_both() {
        let mut scheduler = Scheduler::from_graph(&graph());
        while scheduler.start_next().is_some() {}
        let mut skipped = scheduler.mark_failed(id("carts_etl")).unwrap();
        skipped.sort();
        let mut expected = vec![id("user_summary"), id("category_summary")];
        expected.sort();
        assert_eq!(skipped, expected);
    }

    #[test]
    fn test_skip_unstarted() {
        let mut scheduler = Scheduler::from_graph(&graph());
        scheduler.start_next();
        let skipped = scheduler.skip_unstarted();
        assert_eq!(skipped.len(), 4);
        assert_eq!(scheduler.running_count(), 1);
        assert!(!scheduler.is_complete());
        scheduler.mark_skipped(id("users_etl")).unwrap();
        assert!(scheduler.is_complete());
    }

    #[test]
    fn test_finish_without_start_is_error() {
        let mut scheduler = Scheduler::from_graph(&graph());
        assert!(scheduler.mark_complete(id("users_etl")).is_err());
        assert!(scheduler.mark_failed(id("nope")).is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_summary_runs_iff_every_dep_succeeds(
            failing in proptest::collection::vec(proptest::bool::ANY, 4),
            masks in proptest::collection::vec(0u8..16, 1..5),
        ) {
            let names = ["a", "b", "c", "d"];
            let resources: IndexMap<_, _> = names
                .iter()
                .map(|n| (n.to_string(), resource(n)))
                .collect();
            let summaries: IndexMap<_, _> = masks
                .iter()
                .enumerate()
                .map(|(i, mask)| {
                    let deps = names
                        .iter()
                        .enumerate()
                        .filter(|(bit, _)| mask & (1 << bit) != 0)
                        .map(|(_, n)| n.to_string())
                        .collect();
                    (format!("s{}", i), SummaryConfig {
                        definition: "q.sql".into(),
                        table: format!("s{}_table", i),
                        deps,
                    })
                })
                .collect();
            let graph = GraphBuilder::new().build(&resources, &summaries).unwrap().graph;
            let mut scheduler = Scheduler::from_graph(&graph);

            while let Some(id) = scheduler.start_next() {
                let fail = names
                    .iter()
                    .position(|n| id == NodeId::from_name(&format!("{}_etl", n)))
                    .is_some_and(|i| failing[i]);
                if fail {
                    scheduler.mark_failed(id).unwrap();
                } else {
                    scheduler.mark_complete(id).unwrap();
                }
            }

            proptest::prop_assert!(scheduler.is_complete());
            for (i, mask) in masks.iter().enumerate() {
                let deps_ok = (0..names.len()).all(|bit| mask & (1 << bit) == 0 || !failing[bit]);
                let state = scheduler.state(NodeId::from_name(&format!("s{}_summary", i)));
                let expected = if deps_ok { NodeState::Completed } else { NodeState::Skipped };
                proptest::prop_assert_eq!(state, Some(expected));
            }
        }
    }

    #[test]
    fn test_empty_graph_is_complete() {
        let scheduler = Scheduler::from_graph(&PipelineGraph::default());
        assert!(scheduler.is_complete());
        assert_eq!(scheduler.decide(), ScheduleDecision::Complete);
    }
}

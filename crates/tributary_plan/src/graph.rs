//! Typed pipeline graph.
//!
//! The graph is the result of building a pipeline configuration. It is
//! immutable once built: the builder is the only writer, and everything
//! else sees read-only accessors.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tributary_core::{CoreError, CoreResult, NodeId};

/// One stage of a resource chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageKind {
    /// Page through the listing endpoint
    Fetch,
    /// Drop records that fail the spec
    Validate,
    /// Flatten validated records into table rows
    Transform,
    /// Upload the table to object storage
    Publish,
    /// Replace the warehouse table
    Load,
}

impl StageKind {
    /// Stages of every chain, in execution order
    pub const CHAIN: [StageKind; 5] = [
        Self::Fetch,
        Self::Validate,
        Self::Transform,
        Self::Publish,
        Self::Load,
    ];

    /// Lowercase stage name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Validate => "validate",
            Self::Transform => "transform",
            Self::Publish => "publish",
            Self::Load => "load",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Per-resource stage chain
    Chain {
        /// Resource name
        resource: String,
        /// Stages run in order
        stages: Vec<StageKind>,
    },
    /// Aggregation over loaded tables
    Summary {
        /// Summary name
        summary: String,
        /// SQL definition file
        definition: PathBuf,
        /// Destination table
        table: String,
    },
}

/// A named stage group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// Name-derived id
    pub id: NodeId,
    /// Group name: `<resource>_etl` or `<summary>_summary`
    pub name: String,
    /// What the node runs
    pub kind: NodeKind,
}

impl Node {
    /// Chain node for a resource
    #[must_use]
    pub fn chain(resource: &str) -> Self {
        let name = format!("{}_etl", resource);
        Self {
            id: NodeId::from_name(&name),
            name,
            kind: NodeKind::Chain {
                resource: resource.to_string(),
                stages: StageKind::CHAIN.to_vec(),
            },
        }
    }

    /// Summary node
    #[must_use]
    pub fn summary(summary: &str, definition: PathBuf, table: &str) -> Self {
        let name = format!("{}_summary", summary);
        Self {
            id: NodeId::from_name(&name),
            name,
            kind: NodeKind::Summary {
                summary: summary.to_string(),
                definition,
                table: table.to_string(),
            },
        }
    }

    /// Whether this is a resource chain
    #[must_use]
    pub fn is_chain(&self) -> bool {
        matches!(self.kind, NodeKind::Chain { .. })
    }
}

/// "Must complete before" edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    /// Upstream node
    pub from: NodeId,
    /// Downstream node
    pub to: NodeId,
}

impl Edge {
    /// Create a new edge
    #[must_use]
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }
}

/// Directed acyclic graph of stage groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineGraph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexSet<Edge>,
}

impl PipelineGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, node: Node) -> CoreResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(CoreError::AlreadyExists {
                kind: "node".to_string(),
                id: node.name,
            });
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub(crate) fn add_edge(&mut self, edge: Edge) {
        self.edges.insert(edge);
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Node by id
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Node by group name
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes that must complete before `id`
    #[must_use]
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from)
            .collect()
    }

    /// Nodes waiting on `id`
    #[must_use]
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to)
            .collect()
    }

    /// Nodes with no dependencies
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .keys()
            .copied()
            .filter(|&id| !self.edges.iter().any(|e| e.to == id))
            .collect()
    }

    /// Nodes in dependency order; ties go to the node declared first.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the graph has a cycle
    pub fn topological_order(&self) -> CoreResult<Vec<NodeId>> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for edge in &self.edges {
            if let Some(to) = self.nodes.get_index_of(&edge.to) {
                in_degree[to] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(index) = ready.pop_first() {
            let Some((&id, _)) = self.nodes.get_index(index) else {
                continue;
            };
            order.push(id);
            for next in self.dependents(id) {
                if let Some(j) = self.nodes.get_index_of(&next) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.insert(j);
                    }
                }
            }
        }

        if order.len() == self.nodes.len() {
            Ok(order)
        } else {
            Err(CoreError::config("graph", "dependency cycle detected"))
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

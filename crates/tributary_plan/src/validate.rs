//! Structural checks on a built graph.

use crate::graph::PipelineGraph;
use indexmap::IndexSet;
use tributary_core::{CoreError, CoreResult, NodeId};

/// Check every edge joins known nodes and the graph has no cycle.
///
/// # Errors
///
/// Returns a configuration error naming the dangling edge or the nodes on
/// the cycle
pub fn validate(graph: &PipelineGraph) -> CoreResult<()> {
    check_edges(graph)?;
    check_cycles(graph)
}

fn check_edges(graph: &PipelineGraph) -> CoreResult<()> {
    for edge in graph.edges() {
        for end in [edge.from, edge.to] {
            if !graph.contains(end) {
                return Err(CoreError::config(
                    "graph",
                    format!("edge refers to unknown node {}", end),
                ));
            }
        }
    }
    Ok(())
}

fn check_cycles(graph: &PipelineGraph) -> CoreResult<()> {
    let mut visited = IndexSet::new();
    let mut path = IndexSet::new();

    for node in graph.nodes() {
        if let Some(cycle) = dfs_cycle(node.id, graph, &mut visited, &mut path) {
            let names: Vec<&str> = cycle
                .iter()
                .filter_map(|id| graph.node(*id).map(|n| n.name.as_str()))
                .collect();
            return Err(CoreError::config(
                "graph",
                format!("dependency cycle: {}", names.join(" -> ")),
            ));
        }
    }
    Ok(())
}

fn dfs_cycle(
    id: NodeId,
    graph: &PipelineGraph,
    visited: &mut IndexSet<NodeId>,
    path: &mut IndexSet<NodeId>,
) -> Option<Vec<NodeId>> {
    if let Some(start) = path.get_index_of(&id) {
        let mut cycle: Vec<NodeId> = path.iter().skip(start).copied().collect();
        cycle.push(id);
        return Some(cycle);
    }
    if !visited.insert(id) {
        return None;
    }

    path.insert(id);
    for next in graph.dependents(id) {
        if let Some(cycle) = dfs_cycle(next, graph, visited, path) {
            return Some(cycle);
        }
    }
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    #[test]
    fn test_valid_graph() {
        let mut g = PipelineGraph::new();
        g.add_node(Node::chain("users")).unwrap();
        g.add_node(Node::summary("user", "u.sql".into(), "user_summary_table"))
            .unwrap();
        g.add_edge(Edge::new(
            NodeId::from_name("users_etl"),
            NodeId::from_name("user_summary"),
        ));
        assert!(validate(&g).is_ok());
    }

    #[test]
    fn test_dangling_edge() {
        let mut g = PipelineGraph::new();
        g.add_node(Node::chain("users")).unwrap();
        g.add_edge(Edge::new(
            NodeId::from_name("users_etl"),
            NodeId::from_name("ghost_summary"),
        ));
        assert!(matches!(validate(&g), Err(CoreError::Configuration { .. })));
    }

    #[test]
    fn test_cycle_names_nodes() {
        let mut g = PipelineGraph::new();
        for name in ["a", "b", "c"] {
            g.add_node(Node::chain(name)).unwrap();
        }
        let id = |n: &str| NodeId::from_name(&format!("{}_etl", n));
        g.add_edge(Edge::new(id("a"), id("b")));
        g.add_edge(Edge::new(id("b"), id("c")));
        g.add_edge(Edge::new(id("c"), id("a")));

        match validate(&g) {
            Err(CoreError::Configuration { reason, .. }) => {
                assert_eq!(reason, "dependency cycle: a_etl -> b_etl -> c_etl -> a_etl");
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }
}

//! Builds a [`PipelineGraph`] from pipeline configuration.

use crate::config::{PipelineConfig, ResourceConfig, SummaryConfig};
use crate::graph::{Edge, Node, PipelineGraph};
use crate::validate::validate;
use indexmap::{IndexMap, IndexSet};
use std::path::Path;
use tracing::debug;
use tributary_core::{CoreError, CoreResult, NodeId};

/// Output from building a graph
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The built graph
    pub graph: PipelineGraph,
    /// Build warnings
    pub warnings: Vec<BuildWarning>,
}

/// Something legal but probably unintended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// Summary with an empty `deps` set starts immediately
    NoDependencies {
        /// Summary name
        summary: String,
    },
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDependencies { summary } => {
                write!(f, "summary '{}' has no dependencies and may run before any load", summary)
            }
        }
    }
}

/// Expands resource and summary configuration into a graph
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the graph of a parsed pipeline file
    ///
    /// # Errors
    ///
    /// See [`GraphBuilder::build`]
    pub fn build_config(&self, config: &PipelineConfig) -> CoreResult<BuildOutput> {
        self.build_with_base(&config.resources, &config.summaries, config.base_dir())
    }

    /// Build the graph: one chain per resource, one node per summary, and
    /// an edge from every dependency's chain to its summary.
    ///
    /// Nodes follow declaration order, resources first. Chains get no
    /// edges between each other.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown dependency, an empty
    /// endpoint or target, or two nodes writing the same table or object
    pub fn build(
        &self,
        resources: &IndexMap<String, ResourceConfig>,
        summaries: &IndexMap<String, SummaryConfig>,
    ) -> CoreResult<BuildOutput> {
        self.build_with_base(resources, summaries, Path::new("."))
    }

    fn build_with_base(
        &self,
        resources: &IndexMap<String, ResourceConfig>,
        summaries: &IndexMap<String, SummaryConfig>,
        base_dir: &Path,
    ) -> CoreResult<BuildOutput> {
        let mut graph = PipelineGraph::new();
        let mut warnings = Vec::new();
        let mut tables = IndexSet::new();
        let mut objects = IndexSet::new();
        let mut chains: IndexMap<&str, NodeId> = IndexMap::new();

        for (name, resource) in resources {
            if resource.endpoint.trim().is_empty() {
                return Err(CoreError::config(format!("{}.endpoint", name), "endpoint is empty"));
            }
            if resource.target.trim().is_empty() {
                return Err(CoreError::config(format!("{}.target", name), "target is empty"));
            }
            claim(&mut tables, resource.table(), format!("{}.target", name))?;
            claim(&mut objects, resource.destination.clone(), format!("{}.destination", name))?;

            let node = Node::chain(name);
            chains.insert(name.as_str(), node.id);
            graph.add_node(node)?;
        }

        for (name, summary) in summaries {
            claim(&mut tables, summary.table.clone(), format!("{}.table", name))?;

            let node = Node::summary(name, base_dir.join(&summary.definition), &summary.table);
            let id = node.id;
            graph.add_node(node)?;

            if summary.deps.is_empty() {
                warnings.push(BuildWarning::NoDependencies {
                    summary: name.clone(),
                });
            }
            for dep in &summary.deps {
                let Some(&from) = chains.get(dep.as_str()) else {
                    return Err(CoreError::config(
                        format!("{}.deps", name),
                        format!("unknown resource '{}'", dep),
                    ));
                };
                graph.add_edge(Edge::new(from, id));
            }
        }

        validate(&graph)?;
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built pipeline graph"
        );
        Ok(BuildOutput { graph, warnings })
    }
}

fn claim(seen: &mut IndexSet<String>, name: String, field: String) -> CoreResult<()> {
    if seen.contains(&name) {
        return Err(CoreError::config(field, format!("'{}' is already written by another node", name)));
    }
    seen.insert(name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformDef;
    use crate::graph::NodeKind;
    use proptest::prelude::*;
    use tributary_core::TableSchema;

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

    fn summary(table: &str, deps: &[&str]) -> SummaryConfig {
        SummaryConfig {
            definition: format!("sql/{}.sql", table).into(),
            table: table.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn resources(names: &[&str]) -> IndexMap<String, ResourceConfig> {
        names.iter().map(|n| (n.to_string(), resource(n))).collect()
    }

    fn edge_names(graph: &PipelineGraph) -> Vec<(String, String)> {
        graph
            .edges()
            .map(|e| {
                (
                    graph.node(e.from).unwrap().name.clone(),
                    graph.node(e.to).unwrap().name.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_summary_waits_only_on_declared_deps() {
        let resources = resources(&["A", "B", "C"]);
        let summaries: IndexMap<_, _> =
            [("s".to_string(), summary("s_table", &["A", "B"]))].into_iter().collect();

        let out = GraphBuilder::new().build(&resources, &summaries).unwrap();

        assert_eq!(out.graph.node_count(), 4);
        assert_eq!(
            edge_names(&out.graph),
            vec![
                ("A_etl".to_string(), "s_summary".to_string()),
                ("B_etl".to_string(), "s_summary".to_string()),
            ]
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let resources = resources(&["A", "B"]);
        let summaries: IndexMap<_, _> =
            [("s".to_string(), summary("s_table", &["A", "Z"]))].into_iter().collect();

        let err = GraphBuilder::new().build(&resources, &summaries).unwrap_err();
        match err {
            CoreError::Configuration { field, reason } => {
                assert_eq!(field, "s.deps");
                assert!(reason.contains("'Z'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overlapping_summaries_are_independent() {
        let resources = resources(&["users", "products", "carts"]);
        let summaries: IndexMap<_, _> = [
            ("user".to_string(), summary("user_summary_table", &["users", "carts"])),
            ("category".to_string(), summary("category_summary_table", &["products", "carts"])),
        ]
        .into_iter()
        .collect();

        let out = GraphBuilder::new().build(&resources, &summaries).unwrap();
        let graph = &out.graph;
        let user = graph.node_by_name("user_summary").unwrap().id;
        let category = graph.node_by_name("category_summary").unwrap().id;

        assert!(!graph.dependencies(user).contains(&category));
        assert!(!graph.dependencies(category).contains(&user));
        assert_eq!(graph.entry_nodes().len(), 3);
    }

    #[test]
    fn test_empty_deps_warns() {
        let summaries: IndexMap<_, _> =
            [("s".to_string(), summary("s_table", &[]))].into_iter().collect();
        let out = GraphBuilder::new().build(&IndexMap::new(), &summaries).unwrap();
        assert_eq!(
            out.warnings,
            vec![BuildWarning::NoDependencies { summary: "s".to_string() }]
        );
        assert_eq!(out.graph.entry_nodes().len(), 1);
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let mut resources = resources(&["users"]);
        resources["users"].endpoint = " ".to_string();
        assert!(GraphBuilder::new().build(&resources, &IndexMap::new()).is_err());
    }

    #[test]
    fn test_shared_table_rejected() {
        let resources = resources(&["users"]);
        let summaries: IndexMap<_, _> =
            [("s".to_string(), summary("users_table", &["users"]))].into_iter().collect();
        let err = GraphBuilder::new().build(&resources, &summaries).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { ref field, .. } if field == "s.table"));
    }

    #[test]
    fn test_shared_destination_rejected() {
        let mut resources = resources(&["users", "people"]);
        resources["people"].destination = "users.csv".to_string();
        assert!(GraphBuilder::new().build(&resources, &IndexMap::new()).is_err());
    }

    #[test]
    fn test_summary_definition_resolved_against_base() {
        let config = PipelineConfig::new(
            resources(&["users"]),
            [("user".to_string(), summary("user_summary_table", &["users"]))]
                .into_iter()
                .collect(),
        );
        let out = GraphBuilder::new().build_config(&config).unwrap();
        let node = out.graph.node_by_name("user_summary").unwrap();
        match &node.kind {
            NodeKind::Summary { definition, table, .. } => {
                assert_eq!(definition, &Path::new(".").join("sql/user_summary_table.sql"));
                assert_eq!(table, "user_summary_table");
            }
            NodeKind::Chain { .. } => panic!("expected summary"),
        }
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic(
            deps in proptest::collection::vec(proptest::sample::subsequence(vec!["a", "b", "c", "d"], 0..=4), 0..4)
        ) {
            let resources = resources(&["a", "b", "c", "d"]);
            let summaries: IndexMap<String, SummaryConfig> = deps
                .iter()
                .enumerate()
                .map(|(i, d)| (format!("s{}", i), summary(&format!("s{}_table", i), d)))
                .collect();

            let first = GraphBuilder::new().build(&resources, &summaries).unwrap().graph;
            let second = GraphBuilder::new().build(&resources, &summaries).unwrap().graph;
            prop_assert_eq!(&first, &second);

            for edge in first.edges() {
                prop_assert!(first.node(edge.from).unwrap().is_chain());
                prop_assert!(!first.node(edge.to).unwrap().is_chain());
            }
            let expected: usize = deps.iter().map(Vec::len).sum();
            prop_assert_eq!(first.edge_count(), expected);
        }
    }
}

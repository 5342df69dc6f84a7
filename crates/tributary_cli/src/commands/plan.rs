use super::load_pipeline;
use color_eyre::Result;
use std::path::Path;
use tributary_plan::NodeKind;
use tributary_runtime::Pipeline;

/// Execute the `plan` command: build the graph and print it.
pub fn execute(pipeline_path: &Path, json: bool) -> Result<()> {
    let config = load_pipeline(pipeline_path)?;
    let pipeline = Pipeline::prepare(&config)?;
    let graph = pipeline.graph();
    let order = graph.topological_order()?;

    let name_of = |id| graph.node(id).map_or("?", |n| n.name.as_str());

    if json {
        let doc = serde_json::json!({
            "nodes": graph.nodes().collect::<Vec<_>>(),
            "edges": graph
                .edges()
                .map(|e| serde_json::json!({"from": name_of(e.from), "to": name_of(e.to)}))
                .collect::<Vec<_>>(),
            "order": order.iter().map(|id| name_of(*id)).collect::<Vec<_>>(),
            "warnings": pipeline.warnings().iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Nodes:");
    for node in graph.nodes() {
        match &node.kind {
            NodeKind::Chain { stages, .. } => {
                let stages: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
                println!("  {:24} {}", node.name, stages.join(" -> "));
            }
            NodeKind::Summary {
                definition, table, ..
            } => {
                println!("  {:24} {} -> {}", node.name, definition.display(), table);
            }
        }
    }
    println!("Edges:");
    for edge in graph.edges() {
        println!("  {} -> {}", name_of(edge.from), name_of(edge.to));
    }
    let order: Vec<&str> = order.iter().map(|id| name_of(*id)).collect();
    println!("Order: {}", order.join(", "));
    for warning in pipeline.warnings() {
        println!("Warning: {}", warning);
    }
    Ok(())
}

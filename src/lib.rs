pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

use crate::domain::graph::workflow_graph::WorkflowGraph;
use crate::domain::triple::TripleSet;
use crate::error::Result;
use crate::loader::parser::load_description;

/// Loads a workflow description file and compiles it into a validated
/// plugin graph.
pub fn compile_workflow_file(file_path: &str) -> Result<WorkflowGraph> {
    let description: TripleSet = load_description(file_path)?;
    log::info!("Workflow description parsed successfully.");

    let graph = WorkflowGraph::try_from(&description)?;
    log::info!(
        "Workflow graph compiled: {} nodes, {} edges, {} paths.",
        graph.nodes.len(),
        graph.edges.len(),
        graph.paths.len()
    );

    Ok(graph)
}

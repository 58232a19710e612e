pub mod path;
pub mod plugin_node;
pub mod resource;
pub mod workflow_graph;

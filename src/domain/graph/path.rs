use crate::domain::utils::id::{EndpointId, PathId, PluginId};

/// A designated (inputs, single output) sub-pipeline within the plugin
/// graph, individually addressable and executable.
#[derive(Debug, Clone)]
pub struct Path {
    pub id: PathId,

    /// Entry nodes of the path, in declaration order. Never empty in a
    /// compiled graph.
    pub input_ids: Vec<PluginId>,

    /// The single exit node of the path.
    pub output_id: PluginId,
}

/// An externally addressable endpoint bound to a path.
///
/// Multiple endpoints may link to one path.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub uri: EndpointId,
    pub type_uri: Option<String>,
    pub linked_path: PathId,
}

use std::collections::HashMap;

use crate::domain::graph::resource::ResourceDescription;
use crate::domain::utils::id::PluginId;

/// Represents a node in the plugin graph (one plugin instance to be).
///
/// Created when a type-assertion triple is found, mutated while the
/// remaining description triples are processed, immutable once the graph
/// is compiled.
#[derive(Debug, Clone)]
pub struct PluginNode {
    pub id: PluginId,

    /// URI of the plugin type this node instantiates.
    pub type_uri: String,

    /// Key/value parameters collected from `hasParameter` blank nodes and
    /// from the direct property predicates.
    pub parameters: HashMap<String, String>,

    /// Number of upstream contributions a fan-in node waits for before it
    /// executes. `None` means "wait for all".
    pub input_behaviour: Option<usize>,

    /// Where this plugin executes. Defaults to local, in-process.
    pub deployment: ResourceDescription,
}

impl PluginNode {
    pub fn new(id: PluginId, type_uri: impl Into<String>) -> Self {
        PluginNode {
            id,
            type_uri: type_uri.into(),
            parameters: HashMap::new(),
            input_behaviour: None,
            deployment: ResourceDescription::Local,
        }
    }

    /// True if the description marked this node's input as splittable.
    pub fn is_input_splittable(&self) -> bool {
        self.parameters
            .get(crate::domain::vocabulary::IS_INPUT_SPLITTABLE)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

/// A directed connection between two plugin nodes.
///
/// The graph is a simple digraph: a repeated edge between the same pair is
/// detected by the compiler and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: PluginId,
    pub to: PluginId,
}

impl Edge {
    pub fn new(from: PluginId, to: PluginId) -> Self {
        Edge { from, to }
    }
}

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::graph::path::{Endpoint, Path};
use crate::domain::graph::plugin_node::{Edge, PluginNode};
use crate::domain::graph::resource::{GridDeployment, ResourceDescription};
use crate::domain::plugin::TypeLookup;
use crate::domain::triple::TripleSet;
use crate::domain::utils::id::{EndpointId, PathId, PluginId};
use crate::domain::vocabulary as voc;
use crate::error::{Error, Result};

/// The compiled, validated plugin DAG.
///
/// Invariants: no directed cycle, every edge endpoint references a typed
/// `PluginNode`, every path has a non-empty ordered input list and exactly
/// one output node.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub nodes: HashMap<PluginId, PluginNode>,
    pub edges: Vec<Edge>,
    pub paths: HashMap<PathId, Path>,
    pub endpoints: HashMap<EndpointId, Endpoint>,
}

/// Constructs a complete WorkflowGraph from a workflow description.
///
/// This is the main entry point for compiling a triple collection into the
/// internal graph model. All failures are construction-time and abort the
/// whole compile; no partial graph is returned.
impl TryFrom<&TripleSet> for WorkflowGraph {
    type Error = Error;

    fn try_from(description: &TripleSet) -> Result<Self> {
        WorkflowGraph::compile(description, None)
    }
}

impl WorkflowGraph {
    /// Compiles a workflow description, optionally consulting an external
    /// plugin-type lookup service for unknown types (advisory only).
    pub fn compile(description: &TripleSet, type_lookup: Option<&dyn TypeLookup>) -> Result<Self> {
        // Phase 1: Scan type assertions and create the plugin nodes
        let mut nodes = Self::collect_plugin_nodes(description, type_lookup)?;

        // Phase 2 + 3: Scan connection triples into deduplicated edges
        let edges = Self::collect_edges(description, &nodes)?;

        // Phase 4: Scan parameter and property triples into each node
        Self::collect_parameters(description, &mut nodes);

        // Phase 5: Scan input/output assignments into paths
        let paths = Self::collect_paths(description, &nodes)?;

        // Phase 6: Scan endpoint type/link triples
        let endpoints = Self::collect_endpoints(description, &paths)?;

        // Phase 7: Resolve runsOn triples into resource descriptions
        Self::collect_deployments(description, &mut nodes)?;

        // Phase 8: Reject cyclic graphs
        Self::ensure_acyclic(&nodes, &edges)?;

        Ok(WorkflowGraph { nodes, edges, paths, endpoints })
    }

    /// **Phase 1: Collect Plugin Nodes**
    ///
    /// Both the current `rdf:type` assertion and the deprecated legacy
    /// predicate are accepted; their results are unioned. Subjects typed
    /// with one of the reserved platform classes are not plugin nodes.
    fn collect_plugin_nodes(
        description: &TripleSet,
        type_lookup: Option<&dyn TypeLookup>,
    ) -> Result<HashMap<PluginId, PluginNode>> {
        let mut nodes = HashMap::new();

        let assertions = description
            .with_predicate(voc::RDF_TYPE)
            .filter(|t| !voc::RESERVED_CLASSES.contains(&t.object.as_str()))
            .chain(description.with_predicate(voc::LEGACY_PLUGIN_TYPE));

        for triple in assertions {
            if triple.predicate == voc::LEGACY_PLUGIN_TYPE {
                log::warn!(
                    "Node '{}' uses the deprecated type predicate '{}'",
                    triple.subject,
                    voc::LEGACY_PLUGIN_TYPE
                );
            }

            if let Some(lookup) = type_lookup {
                if !lookup.known_types(&triple.object).contains(&triple.object) {
                    log::warn!("Plugin type '{}' is not known to the registry service", triple.object);
                }
            }

            let id = PluginId::new(triple.subject.clone());
            if let Some(existing) = nodes.get(&id) {
                if existing.type_uri != triple.object {
                    log::warn!(
                        "Node '{}' carries multiple type assertions; keeping '{}', ignoring '{}'",
                        triple.subject,
                        existing.type_uri,
                        triple.object
                    );
                }
                continue;
            }

            nodes.insert(id.clone(), PluginNode::new(id, triple.object.clone()));
        }

        if nodes.is_empty() {
            return Err(Error::GraphConstructionError(
                "workflow description contains no typed plugin nodes".to_string(),
            ));
        }

        Ok(nodes)
    }

    /// **Phase 2 + 3: Collect Edges**
    ///
    /// Both endpoints of a `connectsTo` triple must already be typed nodes;
    /// an edge to or from an untyped node aborts the compile. Repeated
    /// edges between the same pair are dropped with a warning.
    fn collect_edges(description: &TripleSet, nodes: &HashMap<PluginId, PluginNode>) -> Result<Vec<Edge>> {
        let mut edges = Vec::new();
        let mut seen: HashSet<(PluginId, PluginId)> = HashSet::new();

        for triple in description.with_predicate(voc::CONNECTS_TO) {
            let from = PluginId::new(triple.subject.clone());
            let to = PluginId::new(triple.object.clone());

            for endpoint in [&from, &to] {
                if !nodes.contains_key(endpoint) {
                    return Err(Error::GraphConstructionError(format!(
                        "connection '{}' -> '{}' references node '{}' which carries no type assertion",
                        triple.subject, triple.object, endpoint
                    )));
                }
            }

            if !seen.insert((from.clone(), to.clone())) {
                log::warn!("Dropping duplicate connection '{}' -> '{}'", from, to);
                continue;
            }

            edges.push(Edge::new(from, to));
        }

        Ok(edges)
    }

    /// **Phase 4: Collect Parameters**
    ///
    /// `hasParameter` blank nodes contribute key/value pairs; the direct
    /// property predicates (input splittability, input behaviour and the
    /// two serialized-query parameters) land in the same map keyed by
    /// their predicate.
    fn collect_parameters(description: &TripleSet, nodes: &mut HashMap<PluginId, PluginNode>) {
        for triple in description.with_predicate(voc::HAS_PARAMETER) {
            let Some(node) = nodes.get_mut(&PluginId::new(triple.subject.clone())) else {
                log::warn!("Parameter triple on untyped subject '{}' is ignored", triple.subject);
                continue;
            };

            let key = description.object_of(&triple.object, voc::PARAMETER_KEY);
            let value = description.object_of(&triple.object, voc::PARAMETER_VALUE);

            match (key, value) {
                (Some(key), Some(value)) => {
                    node.parameters.insert(key.to_string(), value.to_string());
                }
                _ => {
                    log::warn!(
                        "Parameter '{}' of node '{}' is missing its key or value",
                        triple.object,
                        triple.subject
                    );
                }
            }
        }

        let direct_properties =
            [voc::IS_INPUT_SPLITTABLE, voc::HAS_INPUT_BEHAVIOUR, voc::HAS_SERIALIZED_QUERY, voc::HAS_QUERY_LANGUAGE];

        for predicate in direct_properties {
            for triple in description.with_predicate(predicate) {
                if let Some(node) = nodes.get_mut(&PluginId::new(triple.subject.clone())) {
                    node.parameters.insert(predicate.to_string(), triple.object.clone());
                }
            }
        }

        // The input behaviour is a string-encoded integer.
        for node in nodes.values_mut() {
            if let Some(raw) = node.parameters.get(voc::HAS_INPUT_BEHAVIOUR) {
                match raw.parse::<usize>() {
                    Ok(count) => node.input_behaviour = Some(count),
                    Err(_) => {
                        log::warn!("Node '{}' has a non-numeric input behaviour '{}'", node.id, raw);
                    }
                }
            }
        }
    }

    /// **Phase 5: Collect Paths**
    ///
    /// `hasInput` (optionally numbered: `hasInput1`, `hasInput2`, ...) and
    /// `hasOutput` assignments are grouped by their subject. All inputs are
    /// accumulated in declaration order; a second distinct output
    /// assignment for the same path is fatal, regardless of triple order.
    fn collect_paths(description: &TripleSet, nodes: &HashMap<PluginId, PluginNode>) -> Result<HashMap<PathId, Path>> {
        let mut inputs: HashMap<PathId, Vec<(usize, PluginId)>> = HashMap::new();
        let mut outputs: HashMap<PathId, PluginId> = HashMap::new();

        for triple in description.iter() {
            if triple.predicate == voc::HAS_OUTPUT {
                let path_id = PathId::new(triple.subject.clone());
                let node_id = Self::path_member_node(nodes, &triple.subject, &triple.object)?;

                if let Some(existing) = outputs.get(&path_id) {
                    if *existing != node_id {
                        return Err(Error::GraphConstructionError(format!(
                            "path '{}' has more than one output assignment ('{}' and '{}')",
                            path_id, existing, node_id
                        )));
                    }
                    continue;
                }
                outputs.insert(path_id, node_id);
            } else if let Some(ordinal) = Self::input_ordinal(&triple.predicate) {
                let path_id = PathId::new(triple.subject.clone());
                let node_id = Self::path_member_node(nodes, &triple.subject, &triple.object)?;

                let entries = inputs.entry(path_id).or_default();
                if entries.iter().any(|(_, existing)| *existing == node_id) {
                    log::warn!("Path '{}' declares input '{}' more than once", triple.subject, node_id);
                    continue;
                }
                entries.push((ordinal, node_id));
            }
        }

        let mut paths = HashMap::new();

        for (path_id, output_id) in outputs {
            let Some(mut input_entries) = inputs.remove(&path_id) else {
                return Err(Error::GraphConstructionError(format!("path '{}' declares no inputs", path_id)));
            };

            // Declaration order is kept for equal ordinals.
            input_entries.sort_by_key(|(ordinal, _)| *ordinal);
            let input_ids = input_entries.into_iter().map(|(_, id)| id).collect();

            paths.insert(path_id.clone(), Path { id: path_id, input_ids, output_id });
        }

        if let Some(path_id) = inputs.keys().next() {
            return Err(Error::GraphConstructionError(format!("path '{}' declares no output", path_id)));
        }

        Ok(paths)
    }

    /// Resolves a path input/output object to a typed plugin node.
    fn path_member_node(
        nodes: &HashMap<PluginId, PluginNode>,
        path: &str,
        node: &str,
    ) -> Result<PluginId> {
        let id = PluginId::new(node);
        if !nodes.contains_key(&id) {
            return Err(Error::GraphConstructionError(format!(
                "path '{}' references node '{}' which carries no type assertion",
                path, node
            )));
        }
        Ok(id)
    }

    /// Maps `hasInput`-family predicates to their ordering position.
    /// Returns `None` for predicates outside the family (this includes
    /// `hasInputBehaviour`).
    fn input_ordinal(predicate: &str) -> Option<usize> {
        let suffix = predicate.strip_prefix(voc::HAS_INPUT)?;
        if suffix.is_empty() {
            return Some(0);
        }
        suffix.parse::<usize>().ok()
    }

    /// **Phase 6: Collect Endpoints**
    ///
    /// Every `links` triple binds an endpoint URI to a path. The endpoint
    /// type is taken from the subject's type assertion when present.
    fn collect_endpoints(description: &TripleSet, paths: &HashMap<PathId, Path>) -> Result<HashMap<EndpointId, Endpoint>> {
        let mut endpoints = HashMap::new();

        for triple in description.with_predicate(voc::LINKS) {
            let path_id = PathId::new(triple.object.clone());
            if !paths.contains_key(&path_id) {
                return Err(Error::GraphConstructionError(format!(
                    "endpoint '{}' links unknown path '{}'",
                    triple.subject, triple.object
                )));
            }

            let uri = EndpointId::new(triple.subject.clone());
            let type_uri = description.object_of(&triple.subject, voc::RDF_TYPE).map(|t| t.to_string());

            endpoints.insert(uri.clone(), Endpoint { uri, type_uri, linked_path: path_id });
        }

        Ok(endpoints)
    }

    /// **Phase 7: Collect Deployments**
    ///
    /// A `runsOn` object is resolved either inline (a blank node carrying
    /// deployment property triples) or by dereferencing a JSON descriptor
    /// file. Nodes without `runsOn` keep the local default.
    fn collect_deployments(description: &TripleSet, nodes: &mut HashMap<PluginId, PluginNode>) -> Result<()> {
        for triple in description.with_predicate(voc::RUNS_ON) {
            let Some(node) = nodes.get_mut(&PluginId::new(triple.subject.clone())) else {
                log::warn!("runsOn triple on untyped subject '{}' is ignored", triple.subject);
                continue;
            };

            let deployment = if description.has_subject(&triple.object) {
                Self::resolve_inline_resource(description, &triple.object)?
            } else {
                Self::resolve_resource_file(&triple.object)?
            };

            node.deployment = deployment;
        }

        Ok(())
    }

    fn resolve_inline_resource(description: &TripleSet, resource: &str) -> Result<ResourceDescription> {
        let resource_type = description.object_of(resource, voc::RDF_TYPE);

        match resource_type {
            Some(voc::GRID_RESOURCE) => {
                let property = |predicate: &str| {
                    description.object_of(resource, predicate).unwrap_or_default().to_string()
                };

                Ok(ResourceDescription::Grid(GridDeployment {
                    uri: property(voc::RESOURCE_URI),
                    file_adaptor: property(voc::FILE_ADAPTOR),
                    broker: property(voc::BROKER),
                    install_dir: property(voc::INSTALL_DIR),
                    work_dir: property(voc::WORK_DIR),
                    runtime_dir: property(voc::RUNTIME_DIR),
                    runtime_args: description
                        .objects_of(resource, voc::RUNTIME_ARGS)
                        .into_iter()
                        .map(|a| a.to_string())
                        .collect(),
                    credentials: description.object_of(resource, voc::CREDENTIALS).map(|c| c.to_string()),
                }))
            }
            Some(voc::MANAGED_CONTAINER) => {
                let uri = description
                    .object_of(resource, voc::RESOURCE_URI)
                    .unwrap_or(resource)
                    .to_string();
                Ok(ResourceDescription::ManagedContainer { uri })
            }
            Some(voc::LOCAL_RESOURCE) | None => Ok(ResourceDescription::Local),
            Some(other) => {
                log::warn!("Unknown resource type '{}' on '{}'; defaulting to local execution", other, resource);
                Ok(ResourceDescription::Local)
            }
        }
    }

    fn resolve_resource_file(reference: &str) -> Result<ResourceDescription> {
        let path = reference.strip_prefix("file://").unwrap_or(reference);
        crate::loader::parser::load_resource_description(path)
    }

    /// **Phase 8: Cycle Detection**
    ///
    /// Kahn's algorithm over the node/edge set. Any node left with a
    /// positive in-degree after the peel is part of a cycle.
    fn ensure_acyclic(nodes: &HashMap<PluginId, PluginNode>, edges: &[Edge]) -> Result<()> {
        let mut in_degree: HashMap<&PluginId, usize> = nodes.keys().map(|id| (id, 0)).collect();
        let mut successors: HashMap<&PluginId, Vec<&PluginId>> = HashMap::new();

        for edge in edges {
            *in_degree.entry(&edge.to).or_insert(0) += 1;
            successors.entry(&edge.from).or_default().push(&edge.to);
        }

        let mut queue: VecDeque<&PluginId> =
            in_degree.iter().filter(|(_, degree)| **degree == 0).map(|(id, _)| *id).collect();
        let mut visited = 0usize;

        while let Some(current) = queue.pop_front() {
            visited += 1;

            for successor in successors.get(current).into_iter().flatten() {
                let degree = in_degree.get_mut(*successor).expect("successor must have an in-degree entry");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*successor);
                }
            }
        }

        if visited < nodes.len() {
            let mut cyclic: Vec<&PluginId> =
                in_degree.iter().filter(|(_, degree)| **degree > 0).map(|(id, _)| *id).collect();
            cyclic.sort();
            let witness = cyclic.first().expect("a cycle must leave at least one node unpeeled");

            return Err(Error::GraphCycleError(witness.to_string()));
        }

        Ok(())
    }

    /// All nodes participating in the given path: nodes reachable from one
    /// of the path's inputs that can also reach the path's output.
    pub fn path_members(&self, path_id: &PathId) -> Result<HashSet<PluginId>> {
        let path = self.paths.get(path_id).ok_or_else(|| Error::UnknownPathError(path_id.to_string()))?;

        let forward = self.reachable(&path.input_ids, |edge| (&edge.from, &edge.to));
        let backward = self.reachable(std::slice::from_ref(&path.output_id), |edge| (&edge.to, &edge.from));

        let members: HashSet<PluginId> = forward.intersection(&backward).cloned().collect();

        for input in &path.input_ids {
            if !members.contains(input) {
                log::warn!("Path '{}' input '{}' cannot reach the path output", path_id, input);
            }
        }

        Ok(members)
    }

    /// Edges whose both endpoints participate in the given path.
    pub fn path_edges(&self, members: &HashSet<PluginId>) -> Vec<&Edge> {
        self.edges.iter().filter(|e| members.contains(&e.from) && members.contains(&e.to)).collect()
    }

    fn reachable<'a>(
        &'a self,
        start: &[PluginId],
        direction: impl Fn(&'a Edge) -> (&'a PluginId, &'a PluginId),
    ) -> HashSet<PluginId> {
        let mut visited: HashSet<PluginId> = start.iter().cloned().collect();
        let mut queue: VecDeque<PluginId> = start.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            for edge in &self.edges {
                let (from, to) = direction(edge);
                if *from == current && !visited.contains(to) {
                    visited.insert(to.clone());
                    queue.push_back(to.clone());
                }
            }
        }

        visited
    }
}

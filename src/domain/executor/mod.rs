use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::domain::graph::path::Endpoint;
use crate::domain::graph::resource::ResourceDescription;
use crate::domain::graph::workflow_graph::WorkflowGraph;
use crate::domain::pipeline::control::ControlMessage;
use crate::domain::pipeline::grid::process_broker::ProcessBroker;
use crate::domain::pipeline::grid::remote::RemoteStrategy;
use crate::domain::pipeline::grid::{FileTransfer, ResourceBroker, SharedFsTransfer};
use crate::domain::graph::plugin_node::PluginNode;
use crate::domain::pipeline::queue::Queue;
use crate::domain::pipeline::strategy::{ExecutionStrategy, LocalStrategy};
use crate::domain::pipeline::worker::PluginWorker;
use crate::domain::plugin::{Plugin, PluginRegistry, TypeLookup};
use crate::domain::triple::{Triple, TripleSet};
use crate::domain::utils::id::{EndpointId, PathId, PluginId};
use crate::domain::vocabulary;
use crate::error::{Error, Result};

/// How long `terminate` waits for each worker loop before aborting it.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Compiles workflow descriptions and turns the compiled graph into a
/// running pipeline.
///
/// The executor owns every collaborator the runtime needs: the plugin
/// registry, the optional type-lookup service and the grid backends.
/// Nothing is looked up through ambient global state.
pub struct Executor {
    registry: Arc<PluginRegistry>,
    type_lookup: Option<Arc<dyn TypeLookup>>,
    transfer: Arc<dyn FileTransfer>,
    broker: Arc<dyn ResourceBroker>,
}

impl Executor {
    pub fn new(registry: PluginRegistry) -> Self {
        Executor {
            registry: Arc::new(registry),
            type_lookup: None,
            transfer: Arc::new(SharedFsTransfer),
            broker: Arc::new(ProcessBroker::new()),
        }
    }

    pub fn with_type_lookup(mut self, lookup: Arc<dyn TypeLookup>) -> Self {
        self.type_lookup = Some(lookup);
        self
    }

    /// Replaces the default grid backends, e.g. with site-specific
    /// adaptors or test doubles.
    pub fn with_grid_backends(mut self, transfer: Arc<dyn FileTransfer>, broker: Arc<dyn ResourceBroker>) -> Self {
        self.transfer = transfer;
        self.broker = broker;
        self
    }

    /// Compiles a workflow description into a validated graph.
    pub fn compile(&self, description: &TripleSet) -> Result<WorkflowGraph> {
        WorkflowGraph::compile(description, self.type_lookup.as_deref())
    }

    /// Creates one worker per plugin node, wires queues along every
    /// path's edges, launches all worker loops and returns the handle the
    /// caller drives queries through.
    pub fn start(&self, graph: &WorkflowGraph) -> Result<PipelineHandle> {
        let mut workers: Vec<PluginWorker> = Vec::with_capacity(graph.nodes.len());
        let mut index_of: HashMap<PluginId, usize> = HashMap::new();
        let mut member_paths: HashMap<PluginId, Vec<PathId>> = HashMap::new();

        for node in graph.nodes.values() {
            let plugin = self.registry.create(&node.type_uri)?;

            let mut parameters = Self::parameter_triples(&node.id, &node.parameters);
            if !parameters.is_empty() {
                plugin
                    .initialise(&parameters)
                    .map_err(|e| Error::PluginError(node.id.to_string(), e.to_string()))?;
            }
            // Parameters the plugin announces about itself travel with the
            // description's parameters to the execution strategy.
            parameters.merge(plugin.plugin_parameters());

            let strategy = self.strategy_for(node, &plugin);
            let input_behaviour = node.input_behaviour.or_else(|| plugin.input_behaviour());
            let splittable = node.is_input_splittable();

            let worker =
                PluginWorker::new(node.id.clone(), plugin, strategy, parameters, input_behaviour, splittable);

            index_of.insert(node.id.clone(), workers.len());
            workers.push(worker);
        }

        let mut injection: HashMap<PathId, Vec<Arc<Queue<TripleSet>>>> = HashMap::new();
        let mut sinks: HashMap<PathId, Arc<Queue<TripleSet>>> = HashMap::new();
        let mut output_controls: HashMap<PathId, Arc<Queue<ControlMessage>>> = HashMap::new();

        for path in graph.paths.values() {
            let members = graph.path_members(&path.id)?;

            for member in &members {
                member_paths.entry(member.clone()).or_default().push(path.id.clone());
            }

            // Internal edges of the path each get a dedicated queue.
            for edge in graph.path_edges(&members) {
                let from_index = index_of[&edge.from];
                let to_index = index_of[&edge.to];

                let queue = Arc::new(Queue::new());
                let from_ref = workers[from_index].worker_ref();

                workers[from_index].add_output_queue(path.id.clone(), queue.clone());
                workers[to_index].add_input_queue(path.id.clone(), queue);
                workers[to_index].add_upstream(path.id.clone(), from_ref);
            }

            // Every declared input node gets an injection queue the
            // executor feeds queries into.
            for input_id in &path.input_ids {
                if !members.contains(input_id) {
                    continue;
                }
                let queue = Arc::new(Queue::new());
                workers[index_of[input_id]].add_input_queue(path.id.clone(), queue.clone());
                injection.entry(path.id.clone()).or_default().push(queue);
            }

            // The output node additionally emits into the path's sink.
            let sink = Arc::new(Queue::new());
            let output_index = index_of[&path.output_id];
            workers[output_index].add_output_queue(path.id.clone(), sink.clone());
            sinks.insert(path.id.clone(), sink);
            output_controls.insert(path.id.clone(), workers[output_index].control());
        }

        let slots = workers
            .into_iter()
            .map(|worker| {
                let id = worker.id().clone();
                let control = worker.control();
                let paths = member_paths.remove(&id).unwrap_or_default();
                let join = tokio::spawn(worker.run());
                WorkerSlot { id, control, paths, join }
            })
            .collect();

        log::info!("Pipeline started with {} workers and {} paths", graph.nodes.len(), graph.paths.len());

        Ok(PipelineHandle {
            slots,
            injection,
            sinks,
            output_controls,
            endpoints: graph.endpoints.clone(),
        })
    }

    fn strategy_for(&self, node: &PluginNode, plugin: &Arc<dyn Plugin>) -> Arc<dyn ExecutionStrategy> {
        match &node.deployment {
            ResourceDescription::Local => Arc::new(LocalStrategy::new(plugin.clone())),
            ResourceDescription::ManagedContainer { uri } => {
                log::warn!(
                    "Node '{}' requests managed container '{}'; executing in-process instead",
                    node.id,
                    uri
                );
                Arc::new(LocalStrategy::new(plugin.clone()))
            }
            ResourceDescription::Grid(deployment) => Arc::new(RemoteStrategy::new(
                deployment.clone(),
                node.type_uri.clone(),
                plugin.identifier(),
                self.transfer.clone(),
                self.broker.clone(),
            )),
        }
    }

    /// The node's parameter map as the TripleSet handed to `initialise`
    /// and to the execution strategy.
    fn parameter_triples(node_id: &PluginId, parameters: &HashMap<String, String>) -> TripleSet {
        parameters
            .iter()
            .map(|(key, value)| Triple::new(node_id.as_str(), key.clone(), value.clone()))
            .collect()
    }
}

struct WorkerSlot {
    id: PluginId,
    control: Arc<Queue<ControlMessage>>,
    paths: Vec<PathId>,
    join: JoinHandle<()>,
}

/// A running pipeline, keyed by its path ids.
pub struct PipelineHandle {
    slots: Vec<WorkerSlot>,
    injection: HashMap<PathId, Vec<Arc<Queue<TripleSet>>>>,
    sinks: HashMap<PathId, Arc<Queue<TripleSet>>>,
    output_controls: HashMap<PathId, Arc<Queue<ControlMessage>>>,
    endpoints: HashMap<EndpointId, Endpoint>,
}

impl PipelineHandle {
    pub fn path_ids(&self) -> Vec<&PathId> {
        self.sinks.keys().collect()
    }

    /// Injects a query into a path and kicks off the demand pull.
    ///
    /// The query is encoded as a small TripleSet and enqueued as plain
    /// data on every declared input of the path; the initial `Next` goes
    /// to the path's output worker and propagates upstream from there.
    pub fn execute(&self, query: &str, path_id: &PathId) -> Result<()> {
        let queues = self.injection.get(path_id).ok_or_else(|| Error::UnknownPathError(path_id.to_string()))?;
        let control =
            self.output_controls.get(path_id).ok_or_else(|| Error::UnknownPathError(path_id.to_string()))?;

        let encoded = vocabulary::encode_query(query);
        log::info!("Executing query on path '{}'", path_id);

        for queue in queues {
            queue.put(encoded.clone());
        }

        control.put(ControlMessage::Next(path_id.clone()));
        Ok(())
    }

    /// Blocking read of the path's next emitted result batch.
    pub async fn next_results(&self, path_id: &PathId) -> Result<TripleSet> {
        let sink = self.sinks.get(path_id).ok_or_else(|| Error::UnknownPathError(path_id.to_string()))?;
        Ok(sink.take().await)
    }

    pub fn endpoint(&self, uri: &str) -> Option<&Endpoint> {
        self.endpoints.get(&EndpointId::new(uri))
    }

    /// Issues a stop to every worker and joins all loops.
    ///
    /// A worker parked mid-gather is released by the stop immediately;
    /// loops that still exceed the grace period are aborted.
    pub async fn terminate(self) {
        log::info!("Terminating pipeline with {} workers", self.slots.len());

        for slot in &self.slots {
            let path = slot.paths.first().cloned().unwrap_or_else(|| PathId::new("terminate"));
            slot.control.put(ControlMessage::Stop(path));
        }

        for slot in self.slots {
            let abort = slot.join.abort_handle();
            match tokio::time::timeout(TERMINATE_TIMEOUT, slot.join).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Worker '{}' loop ended abnormally: {}", slot.id, e),
                Err(_) => {
                    log::warn!("Worker '{}' did not stop within {:?}; aborting", slot.id, TERMINATE_TIMEOUT);
                    abort.abort();
                }
            }
        }
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Notify;

use crate::domain::pipeline::control::{ControlMessage, WorkerRef};
use crate::domain::pipeline::queue::Queue;
use crate::domain::pipeline::strategy::ExecutionStrategy;
use crate::domain::plugin::Plugin;
use crate::domain::triple::TripleSet;
use crate::domain::utils::id::{PathId, PluginId};
use crate::error::Result;

/// Upper bound on concurrent split-invocations of one worker. This pool
/// is separate from the one-worker-per-plugin model.
pub const SPLIT_POOL_SIZE: usize = 4;

/// What one gather round produced.
enum GatherOutcome {
    Data(TripleSet),
    EndOfStream,
    Stopped(PathId),
}

/// The runtime counterpart of one `PluginNode`: a single loop that drives
/// one plugin instance.
///
/// A worker is shared by every path its plugin node participates in; the
/// control queue interleaves the messages of all those paths, and the
/// loop handles them strictly one at a time. Two paths through the same
/// plugin therefore execute serially, never concurrently.
///
/// The loop walks `WaitControl -> PropagateDemand -> GatherInputs ->
/// Execute -> EmitOutput` and returns to `WaitControl`, until a `Stop`
/// message or end-of-stream moves it to the terminal state.
pub struct PluginWorker {
    id: PluginId,
    plugin: Arc<dyn Plugin>,
    strategy: Arc<dyn ExecutionStrategy>,

    /// The node's description parameters, as handed to the strategy.
    parameters: TripleSet,

    /// Resolved merge behaviour; `None` waits for all inputs.
    input_behaviour: Option<usize>,
    splittable: bool,

    input_queues: HashMap<PathId, Vec<Arc<Queue<TripleSet>>>>,
    output_queues: HashMap<PathId, Vec<Arc<Queue<TripleSet>>>>,
    upstream: HashMap<PathId, Vec<WorkerRef>>,

    control: Arc<Queue<ControlMessage>>,

    /// Single wake-up primitive shared by every queue this worker may
    /// park on during one gather.
    wakeup: Arc<Notify>,
}

impl PluginWorker {
    pub fn new(
        id: PluginId,
        plugin: Arc<dyn Plugin>,
        strategy: Arc<dyn ExecutionStrategy>,
        parameters: TripleSet,
        input_behaviour: Option<usize>,
        splittable: bool,
    ) -> Self {
        PluginWorker {
            id,
            plugin,
            strategy,
            parameters,
            input_behaviour,
            splittable,
            input_queues: HashMap::new(),
            output_queues: HashMap::new(),
            upstream: HashMap::new(),
            control: Arc::new(Queue::new()),
            wakeup: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> &PluginId {
        &self.id
    }

    pub fn control(&self) -> Arc<Queue<ControlMessage>> {
        self.control.clone()
    }

    pub fn worker_ref(&self) -> WorkerRef {
        WorkerRef { id: self.id.clone(), control: self.control.clone() }
    }

    pub fn add_input_queue(&mut self, path_id: PathId, queue: Arc<Queue<TripleSet>>) {
        self.input_queues.entry(path_id).or_default().push(queue);
    }

    pub fn add_output_queue(&mut self, path_id: PathId, queue: Arc<Queue<TripleSet>>) {
        self.output_queues.entry(path_id).or_default().push(queue);
    }

    pub fn add_upstream(&mut self, path_id: PathId, worker: WorkerRef) {
        self.upstream.entry(path_id).or_default().push(worker);
    }

    /// The worker loop. Runs until stopped or until the local execution
    /// policy lets a plugin failure terminate it.
    pub async fn run(self) {
        log::info!("Worker '{}' started", self.id);

        loop {
            // WaitControl
            let message = self.control.take().await;

            let path_id = match message {
                ControlMessage::Stop(path_id) => {
                    self.stopped(&path_id);
                    return;
                }
                ControlMessage::Next(path_id) => path_id,
            };

            // PropagateDemand: a consumer must ask before a producer is
            // expected to have produced.
            for worker in self.upstream.get(&path_id).into_iter().flatten() {
                worker.send(ControlMessage::Next(path_id.clone()));
            }

            // GatherInputs
            let combined = match self.gather_inputs(&path_id).await {
                GatherOutcome::Stopped(stop_path) => {
                    self.stopped(&stop_path);
                    return;
                }
                GatherOutcome::EndOfStream => {
                    log::info!("Worker '{}' reached end of stream on path '{}'", self.id, path_id);
                    self.emit(&path_id, TripleSet::new());
                    self.stopped(&path_id);
                    return;
                }
                GatherOutcome::Data(combined) => combined,
            };

            // Execute: plugin failures are not translated here; they end
            // this worker's loop (the remote strategy downgrades its own
            // failures before they reach us).
            let result = match self.execute(combined).await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Worker '{}' terminated by execution failure: {}", self.id, e);
                    return;
                }
            };

            // EmitOutput
            self.emit(&path_id, result);
        }
    }

    /// Collects upstream contributions for one execution.
    ///
    /// With m input queues and a configured behaviour n within [0, m],
    /// the gather completes as soon as n queues have contributed (default
    /// n = m). Which n of the m arrive first is deliberately
    /// race-dependent; no merge order is guaranteed. A `Stop` arriving
    /// while the worker is parked here is honored immediately.
    async fn gather_inputs(&self, path_id: &PathId) -> GatherOutcome {
        let queues = self.input_queues.get(path_id).cloned().unwrap_or_default();
        let available = queues.len();

        let required = match self.input_behaviour {
            Some(n) if n <= available => n,
            Some(n) => {
                log::warn!(
                    "Worker '{}' input behaviour {} exceeds its {} input queues; waiting for all",
                    self.id,
                    n,
                    available
                );
                available
            }
            None => available,
        };

        let mut combined = TripleSet::new();
        let mut contributed = vec![false; available];
        let mut contributed_count = 0usize;

        loop {
            // The forced-release path: honor a pending stop before and
            // between waits, without consuming queued Next messages.
            if let Some(ControlMessage::Stop(stop_path)) = self.control.take_matching(ControlMessage::is_stop) {
                log::debug!("Worker '{}' released from gather by stop on path '{}'", self.id, stop_path);
                return GatherOutcome::Stopped(stop_path);
            }

            // Drain arrivals, counting each queue once, and collect no
            // more than the required number of contributions.
            for (index, queue) in queues.iter().enumerate() {
                if contributed_count >= required {
                    break;
                }
                if contributed[index] {
                    continue;
                }

                let batches = queue.drain();
                if batches.is_empty() {
                    continue;
                }

                for batch in batches {
                    combined.merge(batch);
                }
                contributed[index] = true;
                contributed_count += 1;
            }

            if contributed_count >= required {
                break;
            }

            // Park once on the shared wake-up; every still-empty input
            // queue and the control queue arm it.
            let parked = self.wakeup.notified();

            for (index, queue) in queues.iter().enumerate() {
                if !contributed[index] {
                    queue.add_listener(self.wakeup.clone());
                }
            }
            self.control.add_listener(self.wakeup.clone());

            parked.await;
        }

        if combined.is_empty() {
            GatherOutcome::EndOfStream
        } else {
            GatherOutcome::Data(combined)
        }
    }

    /// Runs the execution strategy, splitting the input across a bounded
    /// pool when the node is marked splittable.
    async fn execute(&self, input: TripleSet) -> Result<TripleSet> {
        if !self.splittable || input.len() <= 1 {
            return self.strategy.execute(&input, &self.parameters).await;
        }

        let partitions = input.partition(SPLIT_POOL_SIZE);
        log::debug!("Worker '{}' split-invoking {} partitions", self.id, partitions.len());

        let mut results = stream::iter(partitions.into_iter().map(|partition| {
            let strategy = self.strategy.clone();
            let parameters = self.parameters.clone();
            async move { strategy.execute(&partition, &parameters).await }
        }))
        .buffer_unordered(SPLIT_POOL_SIZE);

        // Union of the partial outputs; no ordering guarantee across
        // partitions.
        let mut union = TripleSet::new();
        while let Some(partial) = results.next().await {
            union.merge(partial?);
        }

        Ok(union)
    }

    fn emit(&self, path_id: &PathId, result: TripleSet) {
        let Some(queues) = self.output_queues.get(path_id) else {
            log::warn!("Worker '{}' has no output queues for path '{}'", self.id, path_id);
            return;
        };

        log::debug!("Worker '{}' emits {} triples on path '{}'", self.id, result.len(), path_id);
        for queue in queues {
            queue.put(result.clone());
        }
    }

    /// Terminal state: pass the stop upstream, then release the plugin
    /// instance. Reached at most once per worker.
    fn stopped(&self, path_id: &PathId) {
        log::info!("Worker '{}' stopped on path '{}'", self.id, path_id);

        for worker in self.upstream.get(path_id).into_iter().flatten() {
            worker.send(ControlMessage::Stop(path_id.clone()));
        }

        self.plugin.shutdown();
    }
}

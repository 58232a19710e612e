use std::sync::Arc;

use crate::domain::pipeline::queue::Queue;
use crate::domain::utils::id::{PathId, PluginId};

/// The two-valued control signal driving the pipeline.
///
/// `Next` travels upstream to demand production for a path; `Stop`
/// travels upstream to shut a path down from its output end backward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Next(PathId),
    Stop(PathId),
}

impl ControlMessage {
    pub fn path_id(&self) -> &PathId {
        match self {
            ControlMessage::Next(path_id) | ControlMessage::Stop(path_id) => path_id,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, ControlMessage::Stop(_))
    }
}

/// Handle to an upstream worker, sufficient to drive demand and shutdown.
///
/// Workers never hold each other directly; they hold the upstream control
/// queues, which avoids ownership cycles between neighbours.
#[derive(Clone)]
pub struct WorkerRef {
    pub id: PluginId,
    pub control: Arc<Queue<ControlMessage>>,
}

impl WorkerRef {
    pub fn send(&self, message: ControlMessage) {
        log::debug!("Control {:?} -> worker '{}'", message, self.id);
        self.control.put(message);
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::plugin::Plugin;
use crate::domain::triple::TripleSet;
use crate::error::Result;

/// How a worker turns gathered input into output.
///
/// Two interchangeable implementations exist: in-process invocation and
/// staged execution on a grid resource.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute(&self, input: &TripleSet, parameters: &TripleSet) -> Result<TripleSet>;
}

/// Invokes the plugin instance in-process.
///
/// Errors raised by the plugin are not translated; they propagate to the
/// worker loop.
pub struct LocalStrategy {
    plugin: Arc<dyn Plugin>,
}

impl LocalStrategy {
    pub fn new(plugin: Arc<dyn Plugin>) -> Self {
        LocalStrategy { plugin }
    }
}

#[async_trait]
impl ExecutionStrategy for LocalStrategy {
    async fn execute(&self, input: &TripleSet, _parameters: &TripleSet) -> Result<TripleSet> {
        self.plugin.invoke(input)
    }
}

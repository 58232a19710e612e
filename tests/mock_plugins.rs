//! Plugin doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reasoning_pipeline::domain::plugin::Plugin;
use reasoning_pipeline::domain::triple::{Triple, TripleSet};
use reasoning_pipeline::error::{Error, Result};

pub const ECHO_TYPE: &str = "urn:test:EchoPlugin";
pub const TAG_TYPE: &str = "urn:test:TagPlugin";
pub const FAILING_TYPE: &str = "urn:test:FailingPlugin";

/// Passes its input through unchanged, counting lifecycle calls.
pub struct EchoPlugin {
    id: String,
    pub shutdowns: Arc<AtomicUsize>,
}

impl EchoPlugin {
    pub fn new(id: impl Into<String>) -> Self {
        EchoPlugin { id: id.into(), shutdowns: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn with_counter(id: impl Into<String>, shutdowns: Arc<AtomicUsize>) -> Self {
        EchoPlugin { id: id.into(), shutdowns }
    }
}

impl Plugin for EchoPlugin {
    fn identifier(&self) -> String {
        self.id.clone()
    }

    fn initialise(&self, _parameters: &TripleSet) -> Result<()> {
        Ok(())
    }

    fn invoke(&self, input: &TripleSet) -> Result<TripleSet> {
        Ok(input.clone())
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Ignores its input and emits a fixed payload.
pub struct SourcePlugin {
    id: String,
    payload: TripleSet,
}

impl SourcePlugin {
    pub fn new(id: impl Into<String>, payload: TripleSet) -> Self {
        SourcePlugin { id: id.into(), payload }
    }
}

impl Plugin for SourcePlugin {
    fn identifier(&self) -> String {
        self.id.clone()
    }

    fn initialise(&self, _parameters: &TripleSet) -> Result<()> {
        Ok(())
    }

    fn invoke(&self, _input: &TripleSet) -> Result<TripleSet> {
        Ok(self.payload.clone())
    }

    fn shutdown(&self) {}
}

/// Maps every input triple independently; pure, so split-invocation must
/// be transparent for it.
pub struct TagPlugin;

impl TagPlugin {
    pub fn tag(triple: &Triple) -> Triple {
        Triple::new(triple.subject.clone(), triple.predicate.clone(), format!("{}::tagged", triple.object))
    }
}

impl Plugin for TagPlugin {
    fn identifier(&self) -> String {
        "urn:test:plugin:tag".to_string()
    }

    fn initialise(&self, _parameters: &TripleSet) -> Result<()> {
        Ok(())
    }

    fn invoke(&self, input: &TripleSet) -> Result<TripleSet> {
        Ok(input.iter().map(Self::tag).collect())
    }

    fn shutdown(&self) {}
}

/// Always fails, exercising the fail-hard local policy.
pub struct FailingPlugin;

impl Plugin for FailingPlugin {
    fn identifier(&self) -> String {
        "urn:test:plugin:failing".to_string()
    }

    fn initialise(&self, _parameters: &TripleSet) -> Result<()> {
        Ok(())
    }

    fn invoke(&self, _input: &TripleSet) -> Result<TripleSet> {
        Err(Error::PluginError("urn:test:plugin:failing".to_string(), "synthetic failure".to_string()))
    }

    fn shutdown(&self) {}
}

/// A distinct single-triple payload for one fan-in producer.
pub fn payload_of(producer: &str) -> TripleSet {
    let mut set = TripleSet::new();
    set.insert(Triple::new(format!("urn:data:{}", producer), "urn:test:producedBy", producer));
    set
}

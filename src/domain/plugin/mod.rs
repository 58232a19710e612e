pub mod builtin;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::triple::TripleSet;
use crate::error::{Error, Result};

/// The fixed contract every processing component fulfils.
///
/// Plugins are black boxes to the pipeline engine: the engine only gathers
/// their input, invokes them and forwards their output. Implementations
/// must be safe to invoke from several split-invocation tasks at once.
pub trait Plugin: Send + Sync {
    /// Stable identifier of this plugin instance.
    fn identifier(&self) -> String;

    /// The plugin's own preferred merge behaviour, overridden by a
    /// `hasInputBehaviour` assertion in the workflow description.
    fn input_behaviour(&self) -> Option<usize> {
        None
    }

    /// Parameters the plugin announces about itself.
    fn plugin_parameters(&self) -> TripleSet {
        TripleSet::new()
    }

    /// Called once before the first invocation when the workflow
    /// description carries parameters for this node.
    fn initialise(&self, parameters: &TripleSet) -> Result<()>;

    fn invoke(&self, input: &TripleSet) -> Result<TripleSet>;

    /// Called exactly once when the owning worker stops.
    fn shutdown(&self);
}

pub type PluginFactory = Box<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// Maps plugin type URIs to instance factories.
///
/// The registry is owned by whoever drives the executor and is passed in
/// explicitly; there is no ambient global plugin table.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry { factories: HashMap::new() }
    }

    /// A registry pre-populated with the platform's built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtin::IDENTITY_PLUGIN_TYPE, || Arc::new(builtin::IdentityPlugin::new()));
        registry
    }

    pub fn register<F>(&mut self, type_uri: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        let type_uri = type_uri.into();
        if self.factories.insert(type_uri.clone(), Box::new(factory)).is_some() {
            log::warn!("Replacing plugin factory for type '{}'", type_uri);
        }
    }

    /// Instantiates a fresh plugin for the given type URI.
    pub fn create(&self, type_uri: &str) -> Result<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(type_uri)
            .ok_or_else(|| Error::UnknownPluginTypeError(type_uri.to_string()))?;
        Ok(factory())
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.factories.keys().map(|k| k.as_str()).collect()
    }
}

/// Query interface of the external plugin-type registry service.
///
/// The service itself (an external reasoning engine) is not part of this
/// crate; the compiler only consults it to warn about unknown types.
pub trait TypeLookup: Send + Sync {
    /// Plugin type URIs known to the service that match the query string.
    fn known_types(&self, query: &str) -> Vec<String>;
}

/// An in-memory type lookup backed by a fixed set of URIs.
pub struct StaticTypeLookup {
    known: HashSet<String>,
}

impl StaticTypeLookup {
    pub fn new(known: impl IntoIterator<Item = String>) -> Self {
        StaticTypeLookup { known: known.into_iter().collect() }
    }

    /// Builds a lookup that knows exactly the types a registry can create.
    pub fn from_registry(registry: &PluginRegistry) -> Self {
        Self::new(registry.registered_types().into_iter().map(|t| t.to_string()))
    }
}

impl TypeLookup for StaticTypeLookup {
    fn known_types(&self, query: &str) -> Vec<String> {
        self.known.iter().filter(|uri| uri.contains(query)).cloned().collect()
    }
}

use std::sync::Mutex;

use crate::domain::triple::TripleSet;
use crate::error::Result;

/// Type URI of the platform's built-in pass-through plugin.
pub const IDENTITY_PLUGIN_TYPE: &str = "http://ns.reasoning-grid.org/workflow#IdentityPlugin";

/// Passes its input through unchanged.
///
/// Used for wiring demonstrations and as the terminal transformer of
/// paths that only route data.
pub struct IdentityPlugin {
    parameters: Mutex<TripleSet>,
}

impl IdentityPlugin {
    pub fn new() -> Self {
        IdentityPlugin { parameters: Mutex::new(TripleSet::new()) }
    }
}

impl Default for IdentityPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::domain::plugin::Plugin for IdentityPlugin {
    fn identifier(&self) -> String {
        "urn:plugin:identity".to_string()
    }

    fn initialise(&self, parameters: &TripleSet) -> Result<()> {
        *self.parameters.lock().expect("identity parameter lock poisoned") = parameters.clone();
        Ok(())
    }

    fn invoke(&self, input: &TripleSet) -> Result<TripleSet> {
        Ok(input.clone())
    }

    fn shutdown(&self) {
        log::debug!("Identity plugin shut down");
    }
}

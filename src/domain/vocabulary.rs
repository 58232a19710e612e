//! The fixed vocabulary understood by the workflow-description compiler.

use crate::domain::triple::{Triple, TripleSet};
use uuid::Uuid;

/// Namespace of the platform's workflow vocabulary.
pub const NS: &str = "http://ns.reasoning-grid.org/workflow#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Deprecated type-assertion predicate, still accepted by the compiler.
pub const LEGACY_PLUGIN_TYPE: &str = "http://ns.reasoning-grid.org/workflow#pluginType";

pub const CONNECTS_TO: &str = "http://ns.reasoning-grid.org/workflow#connectsTo";
pub const HAS_INPUT: &str = "http://ns.reasoning-grid.org/workflow#hasInput";
pub const HAS_OUTPUT: &str = "http://ns.reasoning-grid.org/workflow#hasOutput";
pub const LINKS: &str = "http://ns.reasoning-grid.org/workflow#links";
pub const RUNS_ON: &str = "http://ns.reasoning-grid.org/workflow#runsOn";

pub const HAS_PARAMETER: &str = "http://ns.reasoning-grid.org/workflow#hasParameter";
pub const PARAMETER_KEY: &str = "http://ns.reasoning-grid.org/workflow#parameterKey";
pub const PARAMETER_VALUE: &str = "http://ns.reasoning-grid.org/workflow#parameterValue";

// Property predicates that land directly in the plugin's parameter map.
pub const IS_INPUT_SPLITTABLE: &str = "http://ns.reasoning-grid.org/workflow#isInputSplittable";
pub const HAS_INPUT_BEHAVIOUR: &str = "http://ns.reasoning-grid.org/workflow#hasInputBehaviour";
pub const HAS_SERIALIZED_QUERY: &str = "http://ns.reasoning-grid.org/workflow#hasSerializedQuery";
pub const HAS_QUERY_LANGUAGE: &str = "http://ns.reasoning-grid.org/workflow#hasQueryLanguage";

// Query injection format.
pub const SPARQL_QUERY: &str = "http://ns.reasoning-grid.org/workflow#SPARQLQuery";
pub const HAS_SERIALIZED_FORM: &str = "http://ns.reasoning-grid.org/workflow#hasSerializedForm";

// Endpoint classes.
pub const SPARQL_ENDPOINT: &str = "http://ns.reasoning-grid.org/workflow#SPARQLEndpoint";
pub const MANAGEMENT_ENDPOINT: &str = "http://ns.reasoning-grid.org/workflow#ManagementEndpoint";

// Deployment resource classes and properties.
pub const LOCAL_RESOURCE: &str = "http://ns.reasoning-grid.org/workflow#LocalResource";
pub const GRID_RESOURCE: &str = "http://ns.reasoning-grid.org/workflow#GridResource";
pub const MANAGED_CONTAINER: &str = "http://ns.reasoning-grid.org/workflow#ManagedContainer";
pub const RESOURCE_URI: &str = "http://ns.reasoning-grid.org/workflow#resourceUri";
pub const FILE_ADAPTOR: &str = "http://ns.reasoning-grid.org/workflow#fileAdaptor";
pub const BROKER: &str = "http://ns.reasoning-grid.org/workflow#broker";
pub const INSTALL_DIR: &str = "http://ns.reasoning-grid.org/workflow#installDir";
pub const WORK_DIR: &str = "http://ns.reasoning-grid.org/workflow#workDir";
pub const RUNTIME_DIR: &str = "http://ns.reasoning-grid.org/workflow#runtimeDir";
pub const RUNTIME_ARGS: &str = "http://ns.reasoning-grid.org/workflow#runtimeArgs";
pub const CREDENTIALS: &str = "http://ns.reasoning-grid.org/workflow#credentials";

/// Classes the compiler must not mistake for plugin types when scanning
/// `rdf:type` assertions.
pub const RESERVED_CLASSES: [&str; 6] =
    [SPARQL_QUERY, SPARQL_ENDPOINT, MANAGEMENT_ENDPOINT, LOCAL_RESOURCE, GRID_RESOURCE, MANAGED_CONTAINER];

/// Encodes a query as the small TripleSet that is injected as data into a
/// path: a fresh blank node typed `SPARQLQuery` carrying the serialized
/// query text.
pub fn encode_query(query_text: &str) -> TripleSet {
    let query_node = format!("_:query-{}", Uuid::new_v4());

    let mut set = TripleSet::new();
    set.insert(Triple::new(query_node.clone(), RDF_TYPE, SPARQL_QUERY));
    set.insert(Triple::new(query_node, HAS_SERIALIZED_FORM, query_text));
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_query_shape() {
        let set = encode_query("SELECT ?s WHERE { ?s ?p ?o }");

        assert_eq!(set.len(), 2);

        let subjects = set.subjects_of(RDF_TYPE);
        assert_eq!(subjects.len(), 1);
        let query_node = subjects[0];

        assert_eq!(set.object_of(query_node, RDF_TYPE), Some(SPARQL_QUERY));
        assert_eq!(set.object_of(query_node, HAS_SERIALIZED_FORM), Some("SELECT ?s WHERE { ?s ?p ?o }"));
    }
}

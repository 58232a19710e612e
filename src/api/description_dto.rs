use serde::{Deserialize, Serialize};

/// One statement of a workflow description file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleDto {
    pub subject: String,
    pub predicate: String,
    pub object: String,

    #[serde(default)]
    pub graph: Option<String>,
}

/// The on-disk form of a workflow description.
///
/// The platform's triple-store readers (N3, Turtle, RDF/XML) live outside
/// this crate; the JSON form is the loader-native exchange format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDescriptionDto {
    #[serde(default)]
    pub name: Option<String>,

    pub triples: Vec<TripleDto>,
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single statement of the workflow description or of pipeline data.
///
/// Subjects, predicates and objects are opaque identifier strings (URIs,
/// blank-node tokens or literals); equality is by value. The optional
/// `graph` names the graph context the statement belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub graph: Option<String>,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        Triple { subject: subject.into(), predicate: predicate.into(), object: object.into(), graph: None }
    }

    pub fn with_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}

/// An in-memory collection of triples.
///
/// Logically a set, but insertion order is kept and exact duplicates are
/// not actively removed. All pipeline payloads (queries, intermediate
/// results, plugin parameters) travel as `TripleSet`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripleSet {
    triples: Vec<Triple>,
}

impl TripleSet {
    pub fn new() -> Self {
        TripleSet { triples: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn insert(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    /// Moves all triples of `other` into this set.
    pub fn merge(&mut self, other: TripleSet) {
        self.triples.extend(other.triples);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// All objects of statements matching the given subject and predicate.
    pub fn objects_of(&self, subject: &str, predicate: &str) -> Vec<&str> {
        self.triples
            .iter()
            .filter(|t| t.subject == subject && t.predicate == predicate)
            .map(|t| t.object.as_str())
            .collect()
    }

    /// The first object of a statement matching the given subject and predicate.
    pub fn object_of(&self, subject: &str, predicate: &str) -> Option<&str> {
        self.triples
            .iter()
            .find(|t| t.subject == subject && t.predicate == predicate)
            .map(|t| t.object.as_str())
    }

    /// All subjects of statements carrying the given predicate.
    pub fn subjects_of(&self, predicate: &str) -> Vec<&str> {
        self.triples
            .iter()
            .filter(|t| t.predicate == predicate)
            .map(|t| t.subject.as_str())
            .collect()
    }

    /// All statements carrying the given predicate, in insertion order.
    pub fn with_predicate(&self, predicate: &str) -> impl Iterator<Item = &Triple> {
        self.triples.iter().filter(move |t| t.predicate == predicate)
    }

    /// True if any statement has the given subject.
    pub fn has_subject(&self, subject: &str) -> bool {
        self.triples.iter().any(|t| t.subject == subject)
    }

    /// Splits the set into at most `parts` round-robin partitions.
    ///
    /// Used by split-invocation: each partition is handed to one strategy
    /// invocation, so no partition is empty unless the set itself is.
    pub fn partition(&self, parts: usize) -> Vec<TripleSet> {
        let parts = parts.min(self.triples.len()).max(1);
        let mut result: Vec<TripleSet> = (0..parts).map(|_| TripleSet::new()).collect();

        for (index, triple) in self.triples.iter().enumerate() {
            result[index % parts].insert(triple.clone());
        }

        result
    }
}

impl FromIterator<Triple> for TripleSet {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        TripleSet { triples: iter.into_iter().collect() }
    }
}

impl IntoIterator for TripleSet {
    type Item = Triple;
    type IntoIter = std::vec::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_every_triple() {
        let set: TripleSet = (0..7).map(|i| Triple::new(format!("s{}", i), "p", "o")).collect();

        let parts = set.partition(3);

        assert_eq!(parts.len(), 3);
        let total: usize = parts.iter().map(|p| p.len()).sum();
        assert_eq!(total, 7);

        for triple in set.iter() {
            assert!(parts.iter().any(|p| p.contains(triple)));
        }
    }

    #[test]
    fn test_partition_never_returns_empty_parts() {
        let set: TripleSet = (0..2).map(|i| Triple::new(format!("s{}", i), "p", "o")).collect();

        let parts = set.partition(8);

        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut set = TripleSet::new();
        set.insert(Triple::new("s", "p", "o"));
        set.insert(Triple::new("s", "p", "o"));

        assert_eq!(set.len(), 2);
    }
}

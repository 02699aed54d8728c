use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// FQN → ordered set of referenced FQNs.
///
/// Only declarations that reference something have an entry; the graph is read-only once
/// built and carries no cycle or ordering guarantees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge `from → to`
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.entry(from.into()).or_default().insert(to.into());
    }

    /// Outgoing references of `fqn`, sorted
    pub fn references(&self, fqn: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(fqn)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.edges.contains_key(fqn)
    }

    /// All `(from, to)` pairs, sorted by source then target
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().flat_map(|(from, targets)| {
            targets.iter().map(move |to| (from.as_str(), to.as_str()))
        })
    }

    /// Sources with at least one outgoing edge
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Every FQN mentioned as source or target
    pub fn nodes(&self) -> BTreeSet<&str> {
        self.edges()
            .flat_map(|(from, to)| [from, to])
            .collect()
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Declarations that reference `fqn`, sorted
    pub fn referrers(&self, fqn: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains(fqn))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Fold another graph in (e.g. the graph of another unit)
    pub fn merge(&mut self, other: ReferenceGraph) {
        for (from, targets) in other.edges {
            self.edges.entry(from).or_default().extend(targets);
        }
    }
}

use crate::error::{GraphError, Result};
use crate::types::ReferenceGraph;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Traversal index over a [`ReferenceGraph`]
pub struct GraphIndex {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl GraphIndex {
    pub fn new(refs: &ReferenceGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for (from, to) in refs.edges() {
            let from_idx = *index
                .entry(from.to_string())
                .or_insert_with(|| graph.add_node(from.to_string()));
            let to_idx = *index
                .entry(to.to_string())
                .or_insert_with(|| graph.add_node(to.to_string()));
            graph.add_edge(from_idx, to_idx, ());
        }

        Self { graph, index }
    }

    fn node(&self, fqn: &str) -> Result<NodeIndex> {
        self.index
            .get(fqn)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(fqn.to_string()))
    }

    /// Declarations reachable from `fqn` within `max_depth` hops, with their distance.
    ///
    /// Breadth-first, so each declaration is reported at its shortest distance. Ordered by
    /// distance, then FQN.
    pub fn neighborhood(&self, fqn: &str, max_depth: usize) -> Result<Vec<(String, usize)>> {
        let start = self.node(fqn)?;
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if current != start {
                result.push((self.graph[current].clone(), depth));
            }
            if depth == max_depth {
                continue;
            }
            for edge in self.graph.edges(current) {
                let target = edge.target();
                if visited.insert(target) {
                    queue.push_back((target, depth + 1));
                }
            }
        }

        result.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(result)
    }

    /// Declarations with an edge into `fqn`, sorted
    pub fn referrers(&self, fqn: &str) -> Result<Vec<String>> {
        let node = self.node(fqn)?;
        let mut callers: Vec<String> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|idx| self.graph[idx].clone())
            .collect();
        callers.sort();
        callers.dedup();
        Ok(callers)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl ReferenceGraph {
    /// Hop-limited expansion around `fqn`; see [`GraphIndex::neighborhood`]
    pub fn neighborhood(&self, fqn: &str, max_depth: usize) -> Result<Vec<(String, usize)>> {
        GraphIndex::new(self).neighborhood(fqn, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ReferenceGraph {
        let mut graph = ReferenceGraph::new();
        graph.add_edge("rag.Run", "rag.NewStore");
        graph.add_edge("rag.Run", "rag.(Store).Save");
        graph.add_edge("rag.NewStore", "rag.Store");
        graph.add_edge("rag.(Store).Save", "rag.Store");
        graph.add_edge("rag.Store", "rag.Document");
        graph
    }

    #[test]
    fn neighborhood_reports_shortest_distance() {
        let graph = sample();
        assert_eq!(
            graph.neighborhood("rag.Run", 1).unwrap(),
            vec![
                ("rag.(Store).Save".to_string(), 1),
                ("rag.NewStore".to_string(), 1)
            ]
        );
        assert_eq!(
            graph.neighborhood("rag.Run", 3).unwrap(),
            vec![
                ("rag.(Store).Save".to_string(), 1),
                ("rag.NewStore".to_string(), 1),
                ("rag.Store".to_string(), 2),
                ("rag.Document".to_string(), 3)
            ]
        );
        assert!(graph.neighborhood("rag.Run", 0).unwrap().is_empty());
    }

    #[test]
    fn unknown_fqn_is_an_error() {
        let graph = sample();
        assert!(matches!(
            graph.neighborhood("rag.Nope", 1),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn referrers_follow_incoming_edges() {
        let index = GraphIndex::new(&sample());
        assert_eq!(
            index.referrers("rag.Store").unwrap(),
            vec!["rag.(Store).Save".to_string(), "rag.NewStore".to_string()]
        );
        assert_eq!(index.node_count(), 5);
        assert_eq!(index.edge_count(), 5);
    }
}

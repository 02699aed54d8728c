use crate::types::ReferenceGraph;
use goon_code_chunker::Chunk;

/// Builds the reference graph from resolved chunks
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// One linear pass: every `(chunk.fqn(), reference)` pair becomes an edge
    pub fn build<'c>(&self, chunks: impl IntoIterator<Item = &'c Chunk>) -> ReferenceGraph {
        let mut graph = ReferenceGraph::new();
        for chunk in chunks {
            if chunk.references.is_empty() {
                continue;
            }
            let from = chunk.fqn();
            for target in &chunk.references {
                graph.add_edge(from.as_str(), target.as_str());
            }
        }

        log::info!(
            "Built reference graph: {} sources, {} edges",
            graph.len(),
            graph.edge_count()
        );
        graph
    }
}

/// Aggregate all chunks' references into a [`ReferenceGraph`]
pub fn produce_graph(chunks: &[Chunk]) -> ReferenceGraph {
    GraphBuilder::new().build(chunks)
}

use crate::error::{GraphError, Result};
use crate::graph::GraphIndex;
use crate::types::ReferenceGraph;
use goon_code_chunker::Chunk;
use serde::Serialize;
use std::collections::HashMap;

/// Gathers the declarations around a chunk by following reference edges
pub struct ContextAssembler<'a> {
    index: GraphIndex,
    chunks: HashMap<String, &'a Chunk>,
}

/// How far to follow references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStrategy {
    /// One hop
    Direct,

    /// Two hops
    Extended,

    /// Three hops
    Deep,

    Custom(usize),
}

impl AssemblyStrategy {
    pub const fn depth(self) -> usize {
        match self {
            Self::Direct => 1,
            Self::Extended => 2,
            Self::Deep => 3,
            Self::Custom(d) => d,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    pub primary: Chunk,

    /// Referenced declarations, most relevant first
    pub related: Vec<RelatedChunk>,

    /// Lines across primary and related chunks
    pub total_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedChunk {
    pub chunk: Chunk,
    pub distance: usize,
    pub relevance_score: f32,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(graph: &ReferenceGraph, chunks: &'a [Chunk]) -> Self {
        let chunks = chunks.iter().map(|c| (c.fqn(), c)).collect();
        Self {
            index: GraphIndex::new(graph),
            chunks,
        }
    }

    /// Assemble context for a declaration by FQN
    pub fn assemble(&self, fqn: &str, strategy: AssemblyStrategy) -> Result<AssembledContext> {
        let primary = *self
            .chunks
            .get(fqn)
            .ok_or_else(|| GraphError::NodeNotFound(fqn.to_string()))?;

        // A chunk without outgoing or incoming edges is not in the index
        let reachable = self
            .index
            .neighborhood(fqn, strategy.depth())
            .unwrap_or_default();

        let mut related: Vec<RelatedChunk> = reachable
            .into_iter()
            .filter_map(|(target, distance)| {
                let chunk = self.chunks.get(&target)?;
                Some(RelatedChunk {
                    chunk: (*chunk).clone(),
                    distance,
                    relevance_score: relevance(distance, chunk),
                })
            })
            .collect();

        related.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.fqn().cmp(&b.chunk.fqn()))
        });

        let total_lines = primary.line_count()
            + related
                .iter()
                .map(|rc| rc.chunk.line_count())
                .sum::<usize>();

        Ok(AssembledContext {
            primary: primary.clone(),
            related,
            total_lines,
        })
    }
}

/// Closer declarations rank higher; callables slightly above data at the same distance
fn relevance(distance: usize, chunk: &Chunk) -> f32 {
    let distance_score = 1.0 / (distance as f32 + 1.0);
    let kind_weight = if chunk.is_invokable() { 1.0 } else { 0.8 };
    distance_score * kind_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::produce_graph;
    use goon_code_chunker::{Chunker, ChunkerConfig};
    use pretty_assertions::assert_eq;

    const SRC: &str = "package rag

type Document struct{ ID string }

type Store struct{ docs []Document }

func NewStore() *Store { return &Store{} }

func (s *Store) Save(d Document) { s.docs = append(s.docs, d) }

func Run() {
	NewStore().Save(Document{})
}

func Orphan() {}
";

    fn chunks() -> Vec<Chunk> {
        Chunker::new(ChunkerConfig::default())
            .unwrap()
            .chunk_source("rag/store.go", SRC)
            .unwrap()
    }

    #[test]
    fn direct_strategy_follows_one_hop() {
        let chunks = chunks();
        let graph = produce_graph(&chunks);
        let assembler = ContextAssembler::new(&graph, &chunks);

        let ctx = assembler.assemble("rag.Run", AssemblyStrategy::Direct).unwrap();
        let related: Vec<String> = ctx.related.iter().map(|r| r.chunk.fqn()).collect();
        assert_eq!(
            related,
            vec!["rag.(Store).Save", "rag.NewStore", "rag.Document"]
        );
        assert!(ctx.related.iter().all(|r| r.distance == 1));
    }

    #[test]
    fn deeper_strategy_adds_transitive_declarations() {
        let chunks = chunks();
        let graph = produce_graph(&chunks);
        let assembler = ContextAssembler::new(&graph, &chunks);

        let ctx = assembler.assemble("rag.Run", AssemblyStrategy::Extended).unwrap();
        let store = ctx
            .related
            .iter()
            .find(|r| r.chunk.fqn() == "rag.Store")
            .unwrap();
        assert_eq!(store.distance, 2);
        assert_eq!(
            ctx.total_lines,
            ctx.primary.line_count()
                + ctx.related.iter().map(|r| r.chunk.line_count()).sum::<usize>()
        );
    }

    #[test]
    fn isolated_chunk_has_empty_context() {
        let chunks = chunks();
        let graph = produce_graph(&chunks);
        let assembler = ContextAssembler::new(&graph, &chunks);

        let ctx = assembler.assemble("rag.Orphan", AssemblyStrategy::Deep).unwrap();
        assert!(ctx.related.is_empty());
        assert!(matches!(
            assembler.assemble("rag.Nope", AssemblyStrategy::Direct),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn relevance_decreases_with_distance() {
        let chunks = chunks();
        let func = chunks.iter().find(|c| c.name == "NewStore").unwrap();
        let ty = chunks.iter().find(|c| c.name == "Store").unwrap();
        assert!(relevance(1, func) > relevance(1, ty));
        assert!(relevance(1, ty) > relevance(3, func));
    }
}

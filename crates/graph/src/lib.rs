//! # Goon Graph
//!
//! Reference graph over resolved chunks and hop-limited context expansion.
//!
//! ```text
//! Chunk[] (with references)
//!     │
//!     ├──> Graph Builder        fqn → {referenced fqn}
//!     ├──> ReferenceGraph       ordered adjacency map, serializable
//!     └──> Context Assembler    petgraph BFS around a declaration, ranked by distance
//! ```

mod assembler;
mod builder;
mod error;
mod graph;
mod types;

pub use assembler::{AssembledContext, AssemblyStrategy, ContextAssembler, RelatedChunk};
pub use builder::{produce_graph, GraphBuilder};
pub use error::{GraphError, Result};
pub use graph::GraphIndex;
pub use types::ReferenceGraph;

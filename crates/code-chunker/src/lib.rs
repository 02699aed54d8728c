//! # Goon Code Chunker
//!
//! Decomposes Go packages into addressable declarations ("chunks") and resolves which
//! declarations each chunk refers to.
//!
//! ## Pipeline
//!
//! ```text
//! Go files of one directory
//!     │
//!     ├──> Unit Loader
//!     │    ├─> Tree-sitter parse per file (recovered trees are rejected)
//!     │    ├─> Group by package clause → units
//!     │    └─> TypeTable per unit (definitions + uses)
//!     │
//!     ├──> Chunk Extractor       one Chunk per func / method / type / const / var item
//!     ├──> Identity Assigner     object → FQN (`rag.Store`, `rag.(Store).Save`)
//!     └──> Reference Resolver    uses on a chunk's lines, in any file of the unit → sorted FQNs
//! ```
//!
//! References never cross units: an identifier bound to another package resolves to
//! nothing and is dropped.
//!
//! ## Example
//!
//! ```rust
//! use goon_code_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let code = r#"package rag
//!
//! type Store struct{}
//!
//! func (s *Store) Save() {}
//! "#;
//!
//! let chunks = chunker.chunk_source("rag/store.go", code).unwrap();
//! assert_eq!(chunks[1].fqn(), "rag.(Store).Save");
//! assert_eq!(chunks[1].references, vec!["rag.Store"]);
//! ```

mod ast_analyzer;
mod cancel;
mod chunker;
mod config;
mod error;
mod identity;
mod language;
mod references;
mod resolve;
mod syntax;
mod table;
mod types;
mod unit;

pub use ast_analyzer::{comment_group_text, AstAnalyzer};
pub use cancel::CancellationFlag;
pub use chunker::{Chunker, DirectoryChunks, FileChunks, UnitChunks};
pub use config::{ChunkerConfig, ParseFailurePolicy};
pub use error::{ChunkerError, FailureKind, Result};
pub use identity::IdentityMap;
pub use language::Language;
pub use references::resolve_references;
pub use resolve::build_table;
pub use syntax::{package_hint, GoParser, SourceFile};
pub use table::{FileId, Object, ObjectId, ObjectKind, Occurrence, Position, TypeTable};
pub use types::{content_digest, qualified_name, stable_id, Chunk, ChunkKind};
pub use unit::{
    DirectoryLoad, FileFailure, LoadedUnit, SourceInput, UnitFailure, UnitKey, UnitLoader,
};

//! # Goon Indexer
//!
//! Runs the chunking pipeline over a whole repository.
//!
//! ## Pipeline
//!
//! ```text
//! Repository root
//!     │
//!     ├──> File Scanner (every .go file, vendor/ and testdata/ pruned)
//!     │      └─> SourceInput[] in discovery order
//!     │
//!     ├──> One blocking task per directory (bounded by a semaphore)
//!     │      └─> Chunker: units → chunks with resolved references
//!     │
//!     ├──> Merge after every task finished
//!     │      └─> Chunk[] in discovery then declaration order + IndexStats
//!     │
//!     └──> Graph Builder
//!            └─> ReferenceGraph
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use goon_indexer::{IndexerConfig, RepositoryIndexer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let indexer = RepositoryIndexer::new("/path/to/repo", IndexerConfig::from_env())?;
//!     let run = indexer.produce_graph().await?;
//!
//!     println!("{}", run.stats.summary());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod find_function;
mod indexer;
mod limits;
mod scanner;
mod stats;

pub use config::{
    IndexerConfig, ENV_INDEX_CONCURRENCY, ENV_RESPECT_GITIGNORE, ENV_TIME_BUDGET_MS,
};
pub use error::{IndexerError, Result};
pub use find_function::{find_function, FindFunctionQuery, FunctionMatch};
pub use goon_graph::produce_graph;
pub use indexer::{produce_chunks, ChunkRun, GraphRun, RepositoryIndexer};
pub use scanner::{FileScanner, ScanOptions, ScanOutcome};
pub use stats::IndexStats;

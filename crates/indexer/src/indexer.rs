use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::limits::IndexLimiter;
use crate::scanner::{FileScanner, ScanOutcome};
use crate::stats::IndexStats;
use goon_code_chunker::{
    CancellationFlag, Chunk, Chunker, ChunkerError, DirectoryChunks, FailureKind, FileChunks,
    FileFailure, SourceInput, UnitFailure, UnitKey,
};
use goon_graph::{GraphBuilder, ReferenceGraph};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Chunks of a run in discovery order, with the run report
#[derive(Debug, Clone)]
pub struct ChunkRun {
    pub chunks: Vec<Chunk>,
    pub stats: IndexStats,
}

#[derive(Debug, Clone)]
pub struct GraphRun {
    pub chunks: Vec<Chunk>,
    pub graph: ReferenceGraph,
    pub stats: IndexStats,
}

/// Indexes every Go package below a repository root.
///
/// Each run starts from scratch: discover files, chunk every directory on the blocking
/// pool, then merge once all directory tasks have finished.
pub struct RepositoryIndexer {
    root: PathBuf,
    config: IndexerConfig,
    chunker: Arc<Chunker>,
    cancel: CancellationFlag,
    limiter: IndexLimiter,
}

impl RepositoryIndexer {
    pub fn new(root: impl AsRef<Path>, config: IndexerConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            return Err(IndexerError::InvalidPath(format!(
                "Path does not exist: {}",
                root.display()
            )));
        }
        config.validate()?;

        let chunker = Chunker::new(config.chunker.clone())?;
        Ok(Self {
            root,
            limiter: IndexLimiter::new(config.concurrency),
            config,
            chunker: Arc::new(chunker),
            cancel: CancellationFlag::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Handle that cancels in-flight runs of this indexer. Once set, directories not yet
    /// dispatched are never read and later runs report every file as cancelled.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Chunk every unit; chunks are ordered by file discovery, then declaration order
    pub async fn produce_chunks(&self) -> Result<ChunkRun> {
        let start = Instant::now();
        let cancel = match self.config.time_budget() {
            Some(budget) => self.cancel.clone().with_deadline(start + budget),
            None => self.cancel.clone(),
        };

        log::info!("Indexing repository at {}", self.root.display());

        let root = self.root.clone();
        let options = self.config.scan.clone();
        let ScanOutcome { files, skipped } =
            tokio::task::spawn_blocking(move || FileScanner::new(root, options).scan())
                .await
                .map_err(|e| IndexerError::TaskFailed(e.to_string()))??;

        let mut stats = IndexStats {
            files: files.len() + skipped.len(),
            skipped_files: skipped,
            ..IndexStats::new()
        };

        let groups = group_by_directory(files);
        log::debug!("Dispatching {} directories", groups.len());

        let mut handles = Vec::with_capacity(groups.len());
        for (dir, inputs) in groups {
            let permit = self.limiter.acquire().await?;
            if cancel.is_cancelled() {
                // never dispatched: nothing of the directory is read
                let unread = inputs
                    .iter()
                    .map(|input| FileFailure::new(&input.display_path, &ChunkerError::Cancelled));
                stats.skipped_files.extend(unread);
                continue;
            }
            let snapshot = self.limiter.snapshot();
            log::trace!(
                "Directory tasks in flight: {}/{} ({} waiting)",
                snapshot.in_flight,
                snapshot.limit,
                snapshot.waiters
            );
            let chunker = Arc::clone(&self.chunker);
            let cancel = cancel.clone();
            let task_dir = dir.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                log::debug!("Chunking directory {}", display_dir(&task_dir));
                chunker.chunk_directory(&task_dir, &inputs, &cancel)
            });
            handles.push((dir, handle));
        }

        let mut files: Vec<FileChunks> = Vec::new();
        for (dir, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("Directory task for {} failed: {e}", display_dir(&dir));
                    let unit = UnitKey {
                        dir,
                        package: String::new(),
                    };
                    let error = ChunkerError::unit_load(unit.to_string(), e.to_string());
                    DirectoryChunks {
                        skipped_units: vec![UnitFailure::new(unit, &error)],
                        ..DirectoryChunks::default()
                    }
                }
            };

            stats.skipped_files.extend(outcome.skipped_files);
            stats.skipped_units.extend(outcome.skipped_units);
            stats.units += outcome.units.len();
            files.extend(outcome.units.into_iter().flat_map(|unit| unit.files));
        }

        files.sort_by_key(|f| f.discovery_index);
        let chunks: Vec<Chunk> = files.into_iter().flat_map(|f| f.chunks).collect();

        stats.skipped_files.sort_by(|a, b| a.path.cmp(&b.path));
        stats.skipped_units.sort_by(|a, b| a.unit.cmp(&b.unit));
        stats.cancelled = cancel.is_cancelled()
            || stats
                .skipped_units
                .iter()
                .any(|u| u.kind == FailureKind::Cancelled);
        stats.chunks = chunks.len();
        stats.time_ms = start.elapsed().as_millis() as u64;

        log::info!("{}", stats.summary());
        Ok(ChunkRun { chunks, stats })
    }

    /// Chunk every unit and aggregate the references into a graph
    pub async fn produce_graph(&self) -> Result<GraphRun> {
        let ChunkRun { chunks, mut stats } = self.produce_chunks().await?;
        let graph = GraphBuilder::new().build(&chunks);
        stats.edges = graph.edge_count();
        Ok(GraphRun {
            chunks,
            graph,
            stats,
        })
    }
}

/// Chunk a repository with the environment-derived configuration
pub async fn produce_chunks(root: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let indexer = RepositoryIndexer::new(root, IndexerConfig::from_env())?;
    Ok(indexer.produce_chunks().await?.chunks)
}

/// Directory (display form, `/`-separated) → its files in discovery order
fn group_by_directory(files: Vec<SourceInput>) -> BTreeMap<String, Vec<SourceInput>> {
    let mut groups: BTreeMap<String, Vec<SourceInput>> = BTreeMap::new();
    for file in files {
        let dir = match file.display_path.rfind('/') {
            Some(idx) => file.display_path[..idx].to_string(),
            None => String::new(),
        };
        groups.entry(dir).or_default().push(file);
    }
    groups
}

fn display_dir(dir: &str) -> &str {
    if dir.is_empty() {
        "."
    } else {
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(path: &str, idx: usize) -> SourceInput {
        SourceInput {
            path: PathBuf::from(path),
            display_path: path.to_string(),
            discovery_index: idx,
        }
    }

    #[test]
    fn groups_files_by_parent_directory() {
        let groups = group_by_directory(vec![
            input("main.go", 0),
            input("rag/doc.go", 1),
            input("rag/store.go", 2),
            input("rag/sub/x.go", 3),
        ]);
        let shape: Vec<(&str, Vec<usize>)> = groups
            .iter()
            .map(|(dir, files)| {
                (
                    dir.as_str(),
                    files.iter().map(|f| f.discovery_index).collect(),
                )
            })
            .collect();
        assert_eq!(
            shape,
            vec![("", vec![0]), ("rag", vec![1, 2]), ("rag/sub", vec![3])]
        );
    }

    #[test]
    fn missing_root_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let result = RepositoryIndexer::new(temp.path().join("missing"), IndexerConfig::default());
        assert!(matches!(result, Err(IndexerError::InvalidPath(_))));
    }
}

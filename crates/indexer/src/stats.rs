use goon_code_chunker::{FileFailure, UnitFailure};
use serde::{Deserialize, Serialize};

/// Run report of one indexing pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Source files discovered
    pub files: usize,

    /// Units that produced chunks
    pub units: usize,

    pub chunks: usize,

    /// Reference edges, zero until a graph is built
    pub edges: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Set when the run was cancelled or ran out of budget
    pub cancelled: bool,

    pub skipped_files: Vec<FileFailure>,

    pub skipped_units: Vec<UnitFailure>,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files that contributed chunks
    pub fn indexed_files(&self) -> usize {
        self.files.saturating_sub(self.skipped_files.len())
    }

    /// One line for the run log
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Ingested {} chunks from {} files in {} units ({} edges, {} ms)",
            self.chunks, self.files, self.units, self.edges, self.time_ms
        );
        if !self.skipped_files.is_empty() || !self.skipped_units.is_empty() {
            line.push_str(&format!(
                "; skipped {} files, {} units",
                self.skipped_files.len(),
                self.skipped_units.len()
            ));
        }
        if self.cancelled {
            line.push_str("; cancelled");
        }
        line
    }
}

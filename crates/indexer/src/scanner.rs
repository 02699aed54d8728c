use crate::error::{IndexerError, Result};
use goon_code_chunker::{FailureKind, FileFailure, Language, SourceInput};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MAX_FILE_SIZE_BYTES: u64 = 4 * 1_048_576; // 4 MB

/// Directories the Go tool never treats as part of a package tree
const DEFAULT_SKIPPED_DIRS: &[&str] = &["vendor", "testdata"];

/// What the walk visits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Larger files are reported as skipped instead of parsed
    pub max_file_size: u64,

    /// Honour `.gitignore`, `.git/info/exclude` and the global gitignore
    pub respect_gitignore: bool,

    /// Visit dot-files and dot-directories
    pub include_hidden: bool,

    /// Directory names pruned anywhere below the root
    pub skip_dirs: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE_BYTES,
            respect_gitignore: false,
            include_hidden: true,
            skip_dirs: DEFAULT_SKIPPED_DIRS.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

/// Discovered sources plus the files left out during the walk
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// In discovery order; `discovery_index` matches the position here
    pub files: Vec<SourceInput>,
    pub skipped: Vec<FileFailure>,
}

/// Scanner for finding Go sources below a repository root
pub struct FileScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    /// Walk the root recursively, sorted by file name at every level.
    ///
    /// Entries that cannot be read are logged and skipped; only a missing or unreadable
    /// root fails the scan.
    pub fn scan(&self) -> Result<ScanOutcome> {
        let meta = std::fs::metadata(&self.root).map_err(|e| {
            IndexerError::InvalidPath(format!("{}: {e}", self.root.display()))
        })?;
        if !meta.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }
        std::fs::read_dir(&self.root).map(drop)?;

        let mut outcome = ScanOutcome::default();

        let root = self.root.clone();
        let skip_dirs = self.options.skip_dirs.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(!self.options.include_hidden)
            .parents(self.options.respect_gitignore)
            .ignore(false)
            .git_ignore(self.options.respect_gitignore)
            .git_global(self.options.respect_gitignore)
            .git_exclude(self.options.respect_gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| !is_ignored_scope(entry.path(), &root, &skip_dirs));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() || !is_source_file(entry.path()) {
                continue;
            }

            let path = entry.path();
            let display_path = self.normalize_path(path);
            match entry.metadata() {
                Ok(meta) if meta.len() > self.options.max_file_size => {
                    log::warn!(
                        "Skipping large file {display_path} ({} bytes > {})",
                        meta.len(),
                        self.options.max_file_size
                    );
                    outcome.skipped.push(FileFailure {
                        path: display_path,
                        kind: FailureKind::Io,
                        reason: format!("file exceeds {} bytes", self.options.max_file_size),
                    });
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to stat {display_path}: {e}");
                    continue;
                }
            }

            let discovery_index = outcome.files.len();
            outcome.files.push(SourceInput {
                path: path.to_path_buf(),
                display_path,
                discovery_index,
            });
        }

        log::info!("Found {} source files", outcome.files.len());
        Ok(outcome)
    }

    /// Root-relative, `/`-separated path
    pub fn normalize_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut normalized = relative.to_string_lossy().to_string();
        if normalized.contains('\\') {
            normalized = normalized.replace('\\', "/");
        }
        normalized
    }
}

fn is_source_file(path: &Path) -> bool {
    Language::from_path(path) == Language::Go
}

fn is_ignored_scope(path: &Path, root: &Path, skip_dirs: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        std::path::Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == ".git" || skip_dirs.iter().any(|skip| *skip == name)
        }
        _ => false,
    })
}

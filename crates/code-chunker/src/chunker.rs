use crate::ast_analyzer::AstAnalyzer;
use crate::cancel::CancellationFlag;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, FailureKind, Result};
use crate::identity::IdentityMap;
use crate::references::resolve_references;
use crate::resolve::build_table;
use crate::syntax::GoParser;
use crate::table::FileId;
use crate::types::Chunk;
use crate::unit::{
    DirectoryLoad, FileFailure, LoadedUnit, SourceInput, UnitFailure, UnitKey, UnitLoader,
};

/// Chunks of one file, in declaration order
#[derive(Debug, Clone)]
pub struct FileChunks {
    pub discovery_index: usize,
    pub file_path: String,
    pub chunks: Vec<Chunk>,
}

/// Everything one unit produced
#[derive(Debug, Clone)]
pub struct UnitChunks {
    pub key: UnitKey,
    pub files: Vec<FileChunks>,
    /// Files whose chunks were dropped during extraction
    pub skipped_files: Vec<FileFailure>,
}

impl UnitChunks {
    pub fn chunk_count(&self) -> usize {
        self.files.iter().map(|f| f.chunks.len()).sum()
    }
}

/// Everything one directory produced
#[derive(Debug, Default)]
pub struct DirectoryChunks {
    pub units: Vec<UnitChunks>,
    pub skipped_files: Vec<FileFailure>,
    pub skipped_units: Vec<UnitFailure>,
}

/// Main chunker interface: load units, extract chunks, assign identities, resolve references
pub struct Chunker {
    config: ChunkerConfig,
    analyzer: AstAnalyzer,
    loader: UnitLoader,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self {
            analyzer: AstAnalyzer::new(config.clone()),
            loader: UnitLoader::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Load the files of one directory into units
    pub fn load_directory(
        &self,
        dir: &str,
        inputs: &[SourceInput],
        cancel: &CancellationFlag,
    ) -> DirectoryLoad {
        self.loader.load_directory(dir, inputs, cancel)
    }

    /// Load and chunk every unit of one directory.
    ///
    /// A unit that is cancelled mid-way contributes nothing and is reported as skipped. Once
    /// cancelled, no further file is read and no further table is built.
    pub fn chunk_directory(
        &self,
        dir: &str,
        inputs: &[SourceInput],
        cancel: &CancellationFlag,
    ) -> DirectoryChunks {
        let DirectoryLoad {
            units,
            skipped_files,
            skipped_units,
        } = self.load_directory(dir, inputs, cancel);

        let mut outcome = DirectoryChunks {
            units: Vec::with_capacity(units.len()),
            skipped_files,
            skipped_units,
        };

        for unit in &units {
            match self.chunk_unit(unit, cancel) {
                Ok(chunks) => {
                    outcome.skipped_files.extend(chunks.skipped_files.iter().cloned());
                    outcome.units.push(chunks);
                }
                Err(error) => {
                    if error.kind() != FailureKind::Cancelled {
                        log::warn!("Skipping unit {}: {error}", unit.key);
                    }
                    outcome
                        .skipped_units
                        .push(UnitFailure::new(unit.key.clone(), &error));
                }
            }
        }

        outcome
    }

    /// Extract, identify and resolve one loaded unit.
    ///
    /// Cancellation is checked before each phase; a cancelled unit yields
    /// [`ChunkerError::Cancelled`] and no partial chunks.
    pub fn chunk_unit(&self, unit: &LoadedUnit, cancel: &CancellationFlag) -> Result<UnitChunks> {
        cancel.check()?;

        let mut extracted: Vec<(FileId, Vec<Chunk>)> = Vec::with_capacity(unit.files.len());
        let mut skipped_files = Vec::new();
        for (file_id, file) in unit.files.iter().enumerate() {
            match self.analyzer.extract(file, &unit.key.package) {
                Ok(chunks) => extracted.push((file_id, chunks)),
                Err(error) => {
                    log::warn!("Dropping chunks of {}: {error}", file.path);
                    skipped_files.push(FileFailure::new(&file.path, &error));
                }
            }
        }

        cancel.check()?;
        let identities = IdentityMap::assign(
            &unit.table,
            extracted
                .iter()
                .flat_map(|(file, chunks)| chunks.iter().map(move |chunk| (*file, chunk))),
        );

        cancel.check()?;
        for (_, chunks) in &mut extracted {
            for chunk in chunks.iter_mut() {
                chunk.references = resolve_references(&unit.table, &identities, chunk);
            }
        }

        cancel.check()?;
        let files: Vec<FileChunks> = extracted
            .into_iter()
            .map(|(file_id, chunks)| {
                let file = &unit.files[file_id];
                FileChunks {
                    discovery_index: file.discovery_index,
                    file_path: file.path.clone(),
                    chunks,
                }
            })
            .collect();

        let result = UnitChunks {
            key: unit.key.clone(),
            files,
            skipped_files,
        };
        log::debug!(
            "Chunked unit {}: {} chunks, {} identities",
            result.key,
            result.chunk_count(),
            identities.len()
        );
        Ok(result)
    }

    /// Chunk a single in-memory file as a unit of its own
    pub fn chunk_source(&self, path: &str, source: &str) -> Result<Vec<Chunk>> {
        let mut parser = GoParser::new()?;
        let file = parser.parse(path, source.to_string(), 0)?;
        let dir = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or_default();
        let key = UnitKey {
            dir: dir.to_string(),
            package: file.package.clone(),
        };
        let files = vec![file];
        let table = build_table(&files);
        let unit = LoadedUnit { key, files, table };

        let chunks = self.chunk_unit(&unit, &CancellationFlag::new())?;
        if let Some(failure) = chunks.skipped_files.into_iter().next() {
            return Err(ChunkerError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                failure.reason,
            )));
        }
        Ok(chunks
            .files
            .into_iter()
            .flat_map(|file| file.chunks)
            .collect())
    }
}

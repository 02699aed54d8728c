use crate::cancel::CancellationFlag;
use crate::config::{ChunkerConfig, ParseFailurePolicy};
use crate::error::{ChunkerError, FailureKind};
use crate::resolve::build_table;
use crate::syntax::{package_hint, GoParser, SourceFile};
use crate::table::TypeTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A Go package: one directory plus one package clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    /// Directory relative to the indexed root, `/`-separated, empty for the root itself
    pub dir: String,
    pub package: String,
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dir.is_empty() {
            write!(f, "./ ({})", self.package)
        } else {
            write!(f, "{} ({})", self.dir, self.package)
        }
    }
}

/// A discovered source file, ready to be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInput {
    /// Location on disk
    pub path: PathBuf,
    /// Path reported in chunks (relative to the indexed root)
    pub display_path: String,
    /// Position in discovery order
    pub discovery_index: usize,
}

/// A file left out of the run, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: impl Into<String>, error: &ChunkerError) -> Self {
        Self {
            path: path.into(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// A unit left out of the run, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub unit: UnitKey,
    pub kind: FailureKind,
    pub reason: String,
}

impl UnitFailure {
    pub fn new(unit: UnitKey, error: &ChunkerError) -> Self {
        Self {
            unit,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Parsed files of one unit together with their resolution table
#[derive(Debug)]
pub struct LoadedUnit {
    pub key: UnitKey,
    /// Sorted by discovery order; a file's position here is its `FileId`
    pub files: Vec<SourceFile>,
    pub table: TypeTable,
}

/// Outcome of loading one directory
#[derive(Debug, Default)]
pub struct DirectoryLoad {
    pub units: Vec<LoadedUnit>,
    pub skipped_files: Vec<FileFailure>,
    pub skipped_units: Vec<UnitFailure>,
}

/// Reads, parses and groups the Go files of a directory into units
pub struct UnitLoader {
    policy: ParseFailurePolicy,
}

impl UnitLoader {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            policy: config.parse_failure_policy,
        }
    }

    /// Load all files of one directory. Files are expected to share `dir`.
    ///
    /// Cancellation is checked before each file is read and before each unit's table is
    /// built. Files never read are reported as cancelled, as are units never built.
    pub fn load_directory(
        &self,
        dir: &str,
        inputs: &[SourceInput],
        cancel: &CancellationFlag,
    ) -> DirectoryLoad {
        let mut outcome = DirectoryLoad::default();

        let mut parser = match GoParser::new() {
            Ok(parser) => parser,
            Err(err) => {
                // without a parser no package in the directory can be loaded
                let packages: BTreeSet<String> = inputs
                    .iter()
                    .filter_map(|input| std::fs::read_to_string(&input.path).ok())
                    .filter_map(|source| package_hint(&source))
                    .collect();
                for package in packages {
                    let unit = UnitKey {
                        dir: dir.to_string(),
                        package,
                    };
                    let error = ChunkerError::unit_load(unit.to_string(), err.to_string());
                    outcome.skipped_units.push(UnitFailure::new(unit, &error));
                }
                return outcome;
            }
        };

        let mut ordered: Vec<&SourceInput> = inputs.iter().collect();
        ordered.sort_by_key(|input| input.discovery_index);

        let mut groups: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();
        // packages that lost at least one file to a parse error, with the first reason
        let mut broken: BTreeMap<String, String> = BTreeMap::new();

        for (position, input) in ordered.iter().enumerate() {
            if cancel.is_cancelled() {
                let unread = ordered[position..]
                    .iter()
                    .map(|input| FileFailure::new(&input.display_path, &ChunkerError::Cancelled));
                outcome.skipped_files.extend(unread);
                break;
            }
            let source = match std::fs::read_to_string(&input.path) {
                Ok(source) => source,
                Err(err) => {
                    let error = ChunkerError::from(err);
                    log::warn!("Skipping {}: {error}", input.display_path);
                    outcome
                        .skipped_files
                        .push(FileFailure::new(&input.display_path, &error));
                    continue;
                }
            };

            let hint = package_hint(&source);
            match parser.parse(&input.display_path, source, input.discovery_index) {
                Ok(file) => groups.entry(file.package.clone()).or_default().push(file),
                Err(error) => {
                    log::warn!("Skipping {}: {error}", input.display_path);
                    outcome
                        .skipped_files
                        .push(FileFailure::new(&input.display_path, &error));
                    if let Some(package) = hint {
                        broken.entry(package).or_insert_with(|| error.to_string());
                    }
                }
            }
        }

        for (package, reason) in &broken {
            let parsed_any = groups.contains_key(package);
            if parsed_any && self.policy == ParseFailurePolicy::SkipFile {
                continue;
            }
            let unit = UnitKey {
                dir: dir.to_string(),
                package: package.clone(),
            };
            let message = if parsed_any {
                format!("a file of the package failed to parse: {reason}")
            } else {
                format!("no file of the package could be parsed: {reason}")
            };
            let error = ChunkerError::unit_load(unit.to_string(), message);
            log::warn!("Skipping unit {unit}: {error}");
            outcome.skipped_units.push(UnitFailure::new(unit, &error));
            groups.remove(package);
        }

        for (package, files) in groups {
            let key = UnitKey {
                dir: dir.to_string(),
                package,
            };
            if cancel.is_cancelled() {
                outcome
                    .skipped_units
                    .push(UnitFailure::new(key, &ChunkerError::Cancelled));
                continue;
            }
            let table = build_table(&files);
            log::debug!(
                "Loaded unit {key}: {} files, {} objects",
                files.len(),
                table.object_count()
            );
            outcome.units.push(LoadedUnit { key, files, table });
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_inputs(dir: &TempDir, files: &[(&str, &str)]) -> Vec<SourceInput> {
        files
            .iter()
            .enumerate()
            .map(|(idx, (name, src))| {
                let path = dir.path().join(name);
                std::fs::write(&path, src).unwrap();
                SourceInput {
                    path,
                    display_path: format!("rag/{name}"),
                    discovery_index: idx,
                }
            })
            .collect()
    }

    fn load_rag(config: &ChunkerConfig, inputs: &[SourceInput]) -> DirectoryLoad {
        UnitLoader::new(config).load_directory("rag", inputs, &CancellationFlag::new())
    }

    #[test]
    fn groups_by_package_clause() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(
            &dir,
            &[
                ("store.go", "package rag\n\nfunc A() {}\n"),
                ("store_test.go", "package rag_test\n\nfunc TestA() {}\n"),
                ("index.go", "package rag\n\nfunc B() {}\n"),
            ],
        );
        let load = load_rag(&ChunkerConfig::default(), &inputs);
        let units: Vec<(String, usize)> = load
            .units
            .iter()
            .map(|u| (u.key.package.clone(), u.files.len()))
            .collect();
        assert_eq!(units, vec![("rag".to_string(), 2), ("rag_test".to_string(), 1)]);
        assert!(load.skipped_files.is_empty());
    }

    #[test]
    fn skip_file_policy_keeps_the_rest_of_the_unit() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(
            &dir,
            &[
                ("ok.go", "package rag\n\nfunc A() {}\n"),
                ("bad.go", "package rag\n\nfunc B( {\n"),
            ],
        );
        let load = load_rag(&ChunkerConfig::default(), &inputs);
        assert_eq!(load.units.len(), 1);
        assert_eq!(load.units[0].files.len(), 1);
        assert_eq!(load.skipped_files.len(), 1);
        assert_eq!(load.skipped_files[0].path, "rag/bad.go");
        assert_eq!(load.skipped_files[0].kind, FailureKind::Parse);
        assert!(load.skipped_units.is_empty());
    }

    #[test]
    fn skip_unit_policy_drops_the_whole_package() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(
            &dir,
            &[
                ("ok.go", "package rag\n\nfunc A() {}\n"),
                ("bad.go", "package rag\n\nfunc B( {\n"),
                ("other.go", "package other\n\nfunc C() {}\n"),
            ],
        );
        let load = load_rag(&ChunkerConfig::strict_units(), &inputs);
        assert_eq!(load.units.len(), 1);
        assert_eq!(load.units[0].key.package, "other");
        assert_eq!(load.skipped_units.len(), 1);
        assert_eq!(load.skipped_units[0].kind, FailureKind::UnitLoad);
        assert_eq!(load.skipped_units[0].unit.package, "rag");
    }

    #[test]
    fn fully_broken_unit_is_a_unit_load_failure() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(&dir, &[("bad.go", "package rag\n\nvar = \n")]);
        let load = load_rag(&ChunkerConfig::default(), &inputs);
        assert!(load.units.is_empty());
        assert_eq!(load.skipped_files.len(), 1);
        assert_eq!(load.skipped_units.len(), 1);
    }

    #[test]
    fn unreadable_file_is_an_io_failure() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![SourceInput {
            path: dir.path().join("missing.go"),
            display_path: "rag/missing.go".to_string(),
            discovery_index: 0,
        }];
        let load = load_rag(&ChunkerConfig::default(), &inputs);
        assert_eq!(load.skipped_files[0].kind, FailureKind::Io);
    }

    #[test]
    fn expired_deadline_reads_and_parses_nothing() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(
            &dir,
            &[
                ("store.go", "package rag\n\nfunc A() {}\n"),
                ("index.go", "package rag\n\nfunc B() {}\n"),
            ],
        );
        let cancel = CancellationFlag::new().with_deadline(std::time::Instant::now());
        let load =
            UnitLoader::new(&ChunkerConfig::default()).load_directory("rag", &inputs, &cancel);
        assert!(load.units.is_empty());
        assert!(load.skipped_units.is_empty());
        let skipped: Vec<(&str, FailureKind)> = load
            .skipped_files
            .iter()
            .map(|f| (f.path.as_str(), f.kind))
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("rag/store.go", FailureKind::Cancelled),
                ("rag/index.go", FailureKind::Cancelled)
            ]
        );
    }
}

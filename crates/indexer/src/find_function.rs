use crate::error::{IndexerError, Result};
use crate::scanner::{FileScanner, ScanOptions};
use goon_code_chunker::GoParser;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindFunctionQuery {
    pub name: String,
    pub package: String,
}

/// Source of a located function or method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMatch {
    pub source: String,
    pub path: String,
    pub package: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// First function or method named `query.name` in a file of package `query.package`,
/// in discovery order. Files that do not parse are passed over.
pub fn find_function(root: impl AsRef<Path>, query: &FindFunctionQuery) -> Result<FunctionMatch> {
    let scanner = FileScanner::new(root.as_ref(), ScanOptions::default());
    let outcome = scanner.scan()?;
    let mut parser = GoParser::new()?;

    for input in outcome.files {
        let source = match std::fs::read_to_string(&input.path) {
            Ok(source) => source,
            Err(e) => {
                log::debug!("Skipping unreadable {}: {e}", input.display_path);
                continue;
            }
        };
        let file = match parser.parse(&input.display_path, source, input.discovery_index) {
            Ok(file) => file,
            Err(e) => {
                log::debug!("Skipping {}: {e}", input.display_path);
                continue;
            }
        };
        if file.package != query.package {
            continue;
        }

        let root_node = file.root();
        let mut cursor = root_node.walk();
        for decl in root_node.named_children(&mut cursor) {
            if !matches!(decl.kind(), "function_declaration" | "method_declaration") {
                continue;
            }
            let Some(name) = decl.child_by_field_name("name") else {
                continue;
            };
            if file.text(name) != query.name {
                continue;
            }
            let Some(source) = file.source.get(decl.byte_range()) else {
                continue;
            };
            log::debug!("Found {} in {}", query.name, file.path);
            return Ok(FunctionMatch {
                source: source.to_string(),
                path: file.path.clone(),
                package: file.package.clone(),
                start_line: decl.start_position().row + 1,
                end_line: decl.end_position().row + 1,
            });
        }
    }

    Err(IndexerError::FunctionNotFound(format!(
        "{}.{}",
        query.package, query.name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_function_by_package_and_name() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("golang")).unwrap();
        fs::create_dir_all(temp.path().join("other")).unwrap();
        fs::write(
            temp.path().join("other/parse.go"),
            "package other\n\nfunc Parse() int { return 1 }\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("golang/parse.go"),
            "package golang\n\n// Parse parses.\nfunc Parse(src string) error {\n\treturn nil\n}\n",
        )
        .unwrap();

        let found = find_function(
            temp.path(),
            &FindFunctionQuery {
                name: "Parse".to_string(),
                package: "golang".to_string(),
            },
        )
        .unwrap();

        assert_eq!(found.path, "golang/parse.go");
        assert_eq!(found.source, "func Parse(src string) error {\n\treturn nil\n}");
        assert_eq!((found.start_line, found.end_line), (4, 6));
    }

    #[test]
    fn missing_function_is_an_error() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.go"), "package a\n\nfunc A() {}\n").unwrap();
        let err = find_function(
            temp.path(),
            &FindFunctionQuery {
                name: "B".to_string(),
                package: "a".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, IndexerError::FunctionNotFound(_)));
    }
}

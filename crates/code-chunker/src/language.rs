use crate::error::{ChunkerError, Result};
use std::path::Path;

/// Source language handled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Unknown,
}

impl Language {
    /// Detect language from file extension. Case matters: the Go tool only builds `.go`.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "go" => Language::Go,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Unknown => "unknown",
        }
    }

    /// Function-name prefixes the language's test tooling recognizes
    pub fn test_name_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Go => &["Test"],
            Language::Unknown => &[],
        }
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Go => Ok(tree_sitter_go::LANGUAGE.into()),
            Language::Unknown => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }
}

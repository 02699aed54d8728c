use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while loading and chunking Go sources
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// A single file failed syntactic parsing
    #[error("Parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    /// Type-resolution construction failed for a whole compilation unit
    #[error("Unit load error for {unit}: {message}")]
    UnitLoadError { unit: String, message: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Declaration offsets do not address the loaded source buffer
    #[error("Invalid span in {path}: bytes {start}..{end}")]
    InvalidSpan {
        path: String,
        start: usize,
        end: usize,
    },

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    /// Processing was abandoned through cancellation or an exhausted time budget
    #[error("Cancelled")]
    Cancelled,
}

/// Coarse error classes reported at the run boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Io,
    Parse,
    UnitLoad,
    Cancelled,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Parse => "parse",
            Self::UnitLoad => "unit_load",
            Self::Cancelled => "cancelled",
        }
    }
}

impl ChunkerError {
    /// Create a parse error
    pub fn parse(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a unit load error
    pub fn unit_load(unit: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UnitLoadError {
            unit: unit.into(),
            message: msg.into(),
        }
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    /// Classify the error for run reports
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::ParseError { .. } => FailureKind::Parse,
            Self::IoError(_) | Self::InvalidSpan { .. } => FailureKind::Io,
            Self::Cancelled => FailureKind::Cancelled,
            Self::UnitLoadError { .. }
            | Self::UnsupportedLanguage(_)
            | Self::InvalidConfig(_)
            | Self::TreeSitterError(_) => FailureKind::UnitLoad,
        }
    }
}

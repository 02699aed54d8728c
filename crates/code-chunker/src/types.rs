use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A semantic unit of Go source: one function, method, type, or const/var item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identity, derived from the digest fields
    pub id: String,

    /// Exact source text of the declaration
    pub content: String,

    /// Source file path (relative to the indexed root, `/`-separated)
    pub file_path: String,

    /// Package clause name of the compilation unit
    pub compilation_unit: String,

    pub kind: ChunkKind,

    /// Declared identifier; empty for anonymous value specs
    pub name: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Byte offset of `content` in the source file
    pub start_byte: usize,

    /// Byte offset one past the end of `content`
    pub end_byte: usize,

    /// Leading documentation comment text, empty if none
    pub doc: String,

    /// Base type name the method is bound to; empty for everything but methods
    pub receiver_name: String,

    /// Sorted, deduplicated FQNs this chunk refers to within its unit
    pub references: Vec<String>,
}

impl Chunk {
    /// Fully-qualified name: `unit.Name` or `unit.(Receiver).Name`
    #[must_use]
    pub fn fqn(&self) -> String {
        qualified_name(&self.compilation_unit, &self.receiver_name, &self.name)
    }

    /// Content fingerprint over `(file_path, compilation_unit, start_line, end_line, content)`
    #[must_use]
    pub fn digest(&self) -> String {
        content_digest(
            &self.file_path,
            &self.compilation_unit,
            self.start_line,
            self.end_line,
            &self.content,
        )
    }

    /// Functions and methods can be called; everything else is data or a type
    #[must_use]
    pub const fn is_invokable(&self) -> bool {
        matches!(self.kind, ChunkKind::Function | ChunkKind::Method)
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Build the canonical identity of a declaration
#[must_use]
pub fn qualified_name(unit: &str, receiver: &str, name: &str) -> String {
    if receiver.is_empty() {
        format!("{unit}.{name}")
    } else {
        format!("{unit}.({receiver}).{name}")
    }
}

/// Lowercase hex SHA-256 over the digest fields, in field order
#[must_use]
pub fn content_digest(
    file_path: &str,
    unit: &str,
    start_line: usize,
    end_line: usize,
    content: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update(unit.as_bytes());
    hasher.update(start_line.to_string().as_bytes());
    hasher.update(end_line.to_string().as_bytes());
    hasher.update(content.as_bytes());
    hex_encode_lower(&hasher.finalize())
}

/// Name-based UUID over a digest, so re-indexing unchanged code yields the same id
#[must_use]
pub fn stable_id(digest: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, digest.as_bytes()).to_string()
}

fn hex_encode_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Classification of a chunk, serialized with the tags downstream row stores use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum ChunkKind {
    /// Free function
    #[serde(rename = "func")]
    Function,
    /// Free function following the test naming convention
    #[serde(rename = "test")]
    Test,
    /// Function bound to a receiver type
    #[serde(rename = "method")]
    Method,
    /// `type T struct { ... }`
    #[serde(rename = "struct")]
    StructuredType,
    /// `type T interface { ... }`
    #[serde(rename = "interface")]
    InterfaceType,
    /// Any other type declaration, including defined types and aliases
    #[serde(rename = "type_alias")]
    TypeAlias,
    /// Item of a `const` declaration
    #[serde(rename = "const")]
    ConstGroup,
    /// Item of a `var` declaration
    #[serde(rename = "var")]
    VarGroup,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ChunkKind {
    /// Get the serialized tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "func",
            Self::Test => "test",
            Self::Method => "method",
            Self::StructuredType => "struct",
            Self::InterfaceType => "interface",
            Self::TypeAlias => "type_alias",
            Self::ConstGroup => "const",
            Self::VarGroup => "var",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a serialized tag; unrecognized tags map to `Unknown`
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "func" => Self::Function,
            "test" => Self::Test,
            "method" => Self::Method,
            "struct" => Self::StructuredType,
            "interface" => Self::InterfaceType,
            "type_alias" => Self::TypeAlias,
            "const" => Self::ConstGroup,
            "var" => Self::VarGroup,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

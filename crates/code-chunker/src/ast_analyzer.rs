use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::syntax::{base_type_node, decl_specs, field_children, is_grouped, receiver_type, SourceFile};
use crate::types::{content_digest, stable_id, Chunk, ChunkKind};
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

/// `//go:generate`, `//lint:ignore` and friends are tool directives, not documentation
static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:line |extern |export |[a-z0-9]+:[a-z0-9])").expect("valid directive regex")
});

/// Syntax-tree walker that turns top-level Go declarations into chunks
pub struct AstAnalyzer {
    config: ChunkerConfig,
}

impl AstAnalyzer {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Extract one chunk per function, method, type item and const/var item of `file`,
    /// in declaration order. `references` is left empty.
    pub fn extract(&self, file: &SourceFile, unit: &str) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let root = file.root();
        let mut cursor = root.walk();
        let decls: Vec<_> = root.named_children(&mut cursor).collect();

        for decl in decls {
            match decl.kind() {
                "function_declaration" => {
                    let name = decl
                        .child_by_field_name("name")
                        .map(|n| file.text(n))
                        .unwrap_or_default();
                    let kind = if self.config.is_test_name(name) {
                        ChunkKind::Test
                    } else {
                        ChunkKind::Function
                    };
                    let doc = self.doc_for(file, decl);
                    chunks.push(self.node_to_chunk(file, unit, decl, kind, name, "", doc)?);
                }
                "method_declaration" => {
                    let name = decl
                        .child_by_field_name("name")
                        .map(|n| file.text(n))
                        .unwrap_or_default();
                    let receiver = receiver_type(decl)
                        .and_then(base_type_node)
                        .map(|n| file.text(n))
                        .unwrap_or_default();
                    let doc = self.doc_for(file, decl);
                    // an unnamed receiver type still makes this a method
                    let (kind, receiver) = if receiver.is_empty() {
                        (ChunkKind::Unknown, "")
                    } else {
                        (ChunkKind::Method, receiver)
                    };
                    chunks.push(self.node_to_chunk(file, unit, decl, kind, name, receiver, doc)?);
                }
                "type_declaration" | "const_declaration" | "var_declaration" => {
                    self.extract_group(file, unit, decl, &mut chunks)?;
                }
                // imports and stray statements produce no chunks
                _ => {}
            }
        }

        Ok(chunks)
    }

    /// Expand a `type`/`const`/`var` declaration into one chunk per item
    fn extract_group(
        &self,
        file: &SourceFile,
        unit: &str,
        decl: Node,
        chunks: &mut Vec<Chunk>,
    ) -> Result<()> {
        let grouped = is_grouped(decl);
        let group_doc = self.doc_for(file, decl);

        for spec in decl_specs(decl) {
            let kind = match decl.kind() {
                "const_declaration" => ChunkKind::ConstGroup,
                "var_declaration" => ChunkKind::VarGroup,
                _ => classify_type_spec(spec),
            };

            let name = match kind {
                ChunkKind::ConstGroup | ChunkKind::VarGroup => field_children(spec, "name")
                    .first()
                    .map(|n| file.text(*n))
                    .filter(|n| *n != "_")
                    .unwrap_or_default(),
                _ => spec
                    .child_by_field_name("name")
                    .map(|n| file.text(n))
                    .unwrap_or_default(),
            };

            // the item itself is the span, without the declaration keyword
            let doc = if grouped {
                let own = self.doc_for(file, spec);
                if own.is_empty() {
                    group_doc.clone()
                } else {
                    own
                }
            } else {
                group_doc.clone()
            };

            chunks.push(self.node_to_chunk(file, unit, spec, kind, name, "", doc)?);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn node_to_chunk(
        &self,
        file: &SourceFile,
        unit: &str,
        node: Node,
        kind: ChunkKind,
        name: &str,
        receiver: &str,
        doc: String,
    ) -> Result<Chunk> {
        let start_byte = node.start_byte();
        let end_byte = node.end_byte();
        let content = file
            .source
            .get(start_byte..end_byte)
            .ok_or_else(|| ChunkerError::InvalidSpan {
                path: file.path.clone(),
                start: start_byte,
                end: end_byte,
            })?
            .to_string();

        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let digest = content_digest(&file.path, unit, start_line, end_line, &content);

        Ok(Chunk {
            id: stable_id(&digest),
            content,
            file_path: file.path.clone(),
            compilation_unit: unit.to_string(),
            kind,
            name: name.to_string(),
            start_line,
            end_line,
            start_byte,
            end_byte,
            doc,
            receiver_name: receiver.to_string(),
            references: Vec::new(),
        })
    }

    fn doc_for(&self, file: &SourceFile, node: Node) -> String {
        if !self.config.include_documentation {
            return String::new();
        }
        let comments = leading_comments(node);
        let raw: Vec<&str> = comments.iter().map(|c| file.text(*c)).collect();
        comment_group_text(&raw)
    }
}

/// Shape of a `type` item: struct, interface, or anything else
fn classify_type_spec(spec: Node) -> ChunkKind {
    if spec.kind() == "type_alias" {
        return ChunkKind::TypeAlias;
    }
    match spec.child_by_field_name("type").map(|t| t.kind()) {
        Some("struct_type") => ChunkKind::StructuredType,
        Some("interface_type") => ChunkKind::InterfaceType,
        Some(_) => ChunkKind::TypeAlias,
        None => ChunkKind::Unknown,
    }
}

/// The comment group ending on the line right above `node`, in source order
fn leading_comments(node: Node) -> Vec<Node> {
    let mut group = Vec::new();
    let mut next_row = node.start_position().row;
    let mut current = node.prev_named_sibling();

    while let Some(comment) = current {
        if comment.kind() != "comment" || comment.end_position().row + 1 != next_row {
            break;
        }
        // a trailing comment belongs to the code it follows
        let previous = comment.prev_named_sibling();
        if previous.is_some_and(|p| p.end_position().row == comment.start_position().row) {
            break;
        }
        group.push(comment);
        next_row = comment.start_position().row;
        current = previous;
    }

    group.reverse();
    group
}

/// Render raw comments as documentation text, the way `go doc` does
pub fn comment_group_text(comments: &[&str]) -> String {
    let mut lines: Vec<String> = Vec::new();

    for raw in comments {
        if let Some(body) = raw.strip_prefix("//") {
            if DIRECTIVE.is_match(body) {
                continue;
            }
            let body = body.strip_prefix(' ').unwrap_or(body);
            lines.push(body.trim_end().to_string());
        } else {
            let body = raw
                .strip_prefix("/*")
                .and_then(|b| b.strip_suffix("*/"))
                .unwrap_or(raw);
            lines.extend(body.split('\n').map(|l| l.trim_end().to_string()));
        }
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_empty() && out.last().map_or(true, String::is_empty) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }

    if out.is_empty() {
        return String::new();
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

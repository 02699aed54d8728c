use crate::error::{ChunkerError, Result};
use crate::language::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

static PACKAGE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid package regex")
});

/// A parsed Go file: its exact source text and the syntax tree over it
pub struct SourceFile {
    /// Display path (relative to the indexed root)
    pub path: String,

    /// Source text the tree was parsed from
    pub source: String,

    pub tree: Tree,

    /// Package clause name
    pub package: String,

    /// Position of the file in discovery order
    pub discovery_index: usize,
}

impl SourceFile {
    /// Text of a node, empty if the node does not address this file's buffer
    pub fn text(&self, node: Node) -> &str {
        node_text(node, &self.source)
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("package", &self.package)
            .field("discovery_index", &self.discovery_index)
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// Tree-sitter parser configured for Go
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let ts_language = Language::Go.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(Self { parser })
    }

    /// Parse one file. Trees with recovered syntax errors are rejected.
    pub fn parse(
        &mut self,
        path: impl Into<String>,
        source: String,
        discovery_index: usize,
    ) -> Result<SourceFile> {
        let path = path.into();
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| ChunkerError::parse(&path, "parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let message = match first_error_position(root) {
                Some((row, column)) => format!("syntax error at {}:{}", row + 1, column + 1),
                None => "syntax error".to_string(),
            };
            return Err(ChunkerError::parse(&path, message));
        }

        let package = package_name(root, &source)
            .ok_or_else(|| ChunkerError::parse(&path, "missing package clause"))?;

        Ok(SourceFile {
            path,
            source,
            tree,
            package,
            discovery_index,
        })
    }
}

/// Best-effort package clause lookup for sources that did not parse
pub fn package_hint(source: &str) -> Option<String> {
    PACKAGE_CLAUSE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub(crate) fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub(crate) fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Whether any direct child (named or anonymous) is the given token
pub(crate) fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == token);
    found
}

/// Items of a `type`, `const` or `var` declaration, in source order
pub(crate) fn decl_specs<'t>(decl: Node<'t>) -> Vec<Node<'t>> {
    let mut specs = Vec::new();
    collect_specs(decl, &mut specs);
    specs
}

fn collect_specs<'t>(node: Node<'t>, specs: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        match child.kind() {
            "type_spec" | "type_alias" | "const_spec" | "var_spec" => specs.push(child),
            "var_spec_list" => collect_specs(child, specs),
            _ => {}
        }
    }
}

/// Parenthesized `( ... )` form of a declaration
pub(crate) fn is_grouped(decl: Node) -> bool {
    has_token(decl, "(") || named_children(decl).iter().any(|c| c.kind() == "var_spec_list")
}

/// Strip pointer, parentheses and type arguments down to the named type
pub(crate) fn base_type_node(node: Node) -> Option<Node> {
    match node.kind() {
        "type_identifier" | "identifier" => Some(node),
        "pointer_type" | "parenthesized_type" => {
            named_children(node).into_iter().next().and_then(base_type_node)
        }
        "generic_type" => node.child_by_field_name("type").and_then(base_type_node),
        "qualified_type" => node.child_by_field_name("name"),
        _ => None,
    }
}

/// Type node of a method declaration's receiver
pub(crate) fn receiver_type(method: Node) -> Option<Node> {
    let receiver = method.child_by_field_name("receiver")?;
    named_children(receiver)
        .into_iter()
        .find(|c| c.kind() == "parameter_declaration")
        .and_then(|param| param.child_by_field_name("type"))
}

fn package_name(root: Node, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|child| child.kind() == "package_clause")?;

    let mut clause_cursor = clause.walk();
    let ident = clause
        .named_children(&mut clause_cursor)
        .find(|child| child.kind() == "package_identifier")?;
    let name = node_text(ident, source);
    (!name.is_empty()).then(|| name.to_string())
}

fn first_error_position(node: Node) -> Option<(usize, usize)> {
    let mut current = node;
    loop {
        if current.is_error() || current.is_missing() {
            let pos = current.start_position();
            return Some((pos.row, pos.column));
        }
        let mut cursor = current.walk();
        let next = current
            .children(&mut cursor)
            .find(|child| child.has_error() || child.is_missing());
        current = next?;
    }
}

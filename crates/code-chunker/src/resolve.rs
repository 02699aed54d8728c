//! Builds the [`TypeTable`] of one Go package from its syntax trees.
//!
//! Resolution is purely lexical plus a small amount of static typing: enough to bind
//! `x.Method` and `x.field` selectors when the type of `x` is a named type declared in the
//! same package. Anything imported resolves to nothing.

use crate::syntax::{
    base_type_node, decl_specs, field_children, has_token, named_children, node_text,
    receiver_type, SourceFile,
};
use crate::table::{FileId, ObjectId, ObjectKind, Position, TypeTable};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// Embedded-field promotion depth followed during selector lookup
const MAX_EMBED_DEPTH: usize = 4;

/// Syntax nesting followed by the scoped walk and by static typing. Deeper subtrees are
/// resolved lexically, without scopes or types.
const MAX_NESTING: usize = 128;

/// Statically known shape of an expression. Pointers are transparent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Ty {
    #[default]
    Unknown,
    Named(String),
    Slice(Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    Chan(Box<Ty>),
}

impl Ty {
    fn element(&self) -> Ty {
        match self {
            Ty::Slice(elem) | Ty::Chan(elem) => (**elem).clone(),
            Ty::Map(_, value) => (**value).clone(),
            _ => Ty::Unknown,
        }
    }
}

/// Build the identifier resolution table for the files of one package
pub fn build_table(files: &[SourceFile]) -> TypeTable {
    let mut builder = TableBuilder::new(files);
    builder.declare_package();
    builder.compute_signatures();
    builder.resolve_bodies();
    builder.table.finish()
}

enum Pending<'a> {
    Field { obj: ObjectId, ty: Node<'a> },
    Signature { obj: ObjectId, decl: Node<'a> },
    Value { obj: ObjectId, spec: Node<'a>, index: usize },
}

/// A scope entry of `None` hides outer names without denoting anything we track
type Scope = HashMap<String, Option<ObjectId>>;

struct TableBuilder<'a> {
    files: &'a [SourceFile],
    table: TypeTable,
    file: FileId,

    package: HashMap<String, ObjectId>,
    imports: Vec<HashMap<String, ObjectId>>,
    scopes: Vec<Scope>,

    /// (type, name) → method or interface method
    methods: HashMap<(String, String), ObjectId>,
    /// (type, name) → struct field
    fields: HashMap<(String, String), ObjectId>,
    embedded: HashMap<String, Vec<String>>,
    /// `type A = B` → B, for aliases of a package-local named type
    aliases: HashMap<String, String>,
    structs: HashSet<String>,
    underlying: HashMap<String, Ty>,

    value_types: HashMap<ObjectId, Ty>,
    results: HashMap<ObjectId, Vec<Ty>>,
    pending: Vec<(FileId, Pending<'a>)>,

    depth: usize,
    typing_depth: Cell<usize>,
    /// Files already reported as too deeply nested
    flattened: HashSet<FileId>,
}

impl<'a> TableBuilder<'a> {
    fn new(files: &'a [SourceFile]) -> Self {
        Self {
            files,
            table: TypeTable::default(),
            file: 0,
            package: HashMap::new(),
            imports: Vec::with_capacity(files.len()),
            scopes: Vec::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
            embedded: HashMap::new(),
            aliases: HashMap::new(),
            structs: HashSet::new(),
            underlying: HashMap::new(),
            value_types: HashMap::new(),
            results: HashMap::new(),
            pending: Vec::new(),
            depth: 0,
            typing_depth: Cell::new(0),
            flattened: HashSet::new(),
        }
    }

    fn text(&self, node: Node) -> &'a str {
        let files: &'a [SourceFile] = self.files;
        node_text(node, &files[self.file].source)
    }

    fn pos(&self, node: Node) -> Position {
        Position {
            file: self.file,
            line: node.start_position().row + 1,
            offset: node.start_byte(),
        }
    }

    // Pass 1: package-level objects, struct members, interface methods, imports.

    fn declare_package(&mut self) {
        let files: &'a [SourceFile] = self.files;
        for (idx, file) in files.iter().enumerate() {
            self.file = idx;
            self.imports.push(HashMap::new());
            for decl in named_children(file.root()) {
                match decl.kind() {
                    "import_declaration" => self.declare_imports(decl),
                    "function_declaration" => self.declare_function(decl),
                    "method_declaration" => self.declare_method(decl),
                    "type_declaration" => {
                        for spec in decl_specs(decl) {
                            self.declare_type(spec);
                        }
                    }
                    "const_declaration" | "var_declaration" => {
                        let is_const = decl.kind() == "const_declaration";
                        for spec in decl_specs(decl) {
                            self.declare_values(spec, is_const);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn declare_imports(&mut self, node: Node<'a>) {
        for child in named_children(node) {
            match child.kind() {
                "import_spec_list" => self.declare_imports(child),
                "import_spec" => {
                    let Some(path_node) = child.child_by_field_name("path") else {
                        continue;
                    };
                    let path = self
                        .text(path_node)
                        .trim_matches(|c| c == '"' || c == '`')
                        .to_string();
                    let (name, at) = match child.child_by_field_name("name") {
                        Some(alias) if alias.kind() == "package_identifier" => {
                            (self.text(alias).to_string(), alias)
                        }
                        // dot and blank imports bind no name
                        Some(_) => continue,
                        None => (import_name(&path), path_node),
                    };
                    let pos = self.pos(at);
                    let id = self.table.add_object(name.clone(), ObjectKind::PkgName { path }, pos);
                    self.imports[self.file].insert(name, id);
                }
                _ => {}
            }
        }
    }

    fn declare_function(&mut self, decl: Node<'a>) {
        let Some(name_node) = decl.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        let id = self.table.add_object(name, ObjectKind::Func, self.pos(name_node));
        // init and blank functions cannot be referred to
        if name != "init" && name != "_" {
            self.package.insert(name.to_string(), id);
        }
        self.pending.push((self.file, Pending::Signature { obj: id, decl }));
    }

    fn declare_method(&mut self, decl: Node<'a>) {
        let Some(name_node) = decl.child_by_field_name("name") else {
            return;
        };
        let receiver = receiver_type(decl)
            .and_then(base_type_node)
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let name = self.text(name_node);
        let id = self.table.add_object(
            name,
            ObjectKind::Method {
                receiver: receiver.clone(),
            },
            self.pos(name_node),
        );
        if name != "_" {
            self.methods.insert((receiver, name.to_string()), id);
        }
        self.pending.push((self.file, Pending::Signature { obj: id, decl }));
    }

    fn declare_type(&mut self, spec: Node<'a>) {
        let Some(name_node) = spec.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let id = self
            .table
            .add_object(name.clone(), ObjectKind::TypeName, self.pos(name_node));
        self.package.insert(name.clone(), id);

        let Some(ty) = spec.child_by_field_name("type") else {
            return;
        };
        if spec.kind() == "type_alias" {
            if let Some(target) = base_type_node(ty).filter(|_| ty.kind() != "qualified_type") {
                self.aliases.insert(name.clone(), self.text(target).to_string());
            }
        }
        match ty.kind() {
            "struct_type" => {
                self.structs.insert(name.clone());
                self.declare_fields(&name, ty);
            }
            "interface_type" => self.declare_interface(&name, ty),
            _ => {}
        }
    }

    fn declare_fields(&mut self, owner: &str, struct_type: Node<'a>) {
        for list in named_children(struct_type) {
            if list.kind() != "field_declaration_list" {
                continue;
            }
            for field in named_children(list) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                let Some(ty) = field.child_by_field_name("type") else {
                    continue;
                };
                let names = field_children(field, "name");
                if names.is_empty() {
                    // embedded field, named after its type
                    let Some(base) = base_type_node(ty) else {
                        continue;
                    };
                    let name = self.text(base).to_string();
                    if ty.kind() != "qualified_type" {
                        self.embedded
                            .entry(owner.to_string())
                            .or_default()
                            .push(name.clone());
                    }
                    self.declare_field(owner, &name, base, ty);
                } else {
                    for name_node in names {
                        let name = self.text(name_node).to_string();
                        self.declare_field(owner, &name, name_node, ty);
                    }
                }
            }
        }
    }

    fn declare_field(&mut self, owner: &str, name: &str, at: Node, ty: Node<'a>) {
        let id = self.table.add_object(
            name,
            ObjectKind::Field {
                owner: owner.to_string(),
            },
            self.pos(at),
        );
        self.fields.insert((owner.to_string(), name.to_string()), id);
        self.pending.push((self.file, Pending::Field { obj: id, ty }));
    }

    fn declare_interface(&mut self, owner: &str, iface: Node<'a>) {
        for elem in named_children(iface) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name_node) = elem.child_by_field_name("name") else {
                        continue;
                    };
                    let name = self.text(name_node).to_string();
                    let id = self.table.add_object(
                        name.clone(),
                        ObjectKind::InterfaceMethod {
                            owner: owner.to_string(),
                        },
                        self.pos(name_node),
                    );
                    self.methods.insert((owner.to_string(), name), id);
                    self.pending
                        .push((self.file, Pending::Signature { obj: id, decl: elem }));
                }
                "type_elem" | "interface_type_name" | "constraint_elem" => {
                    let embedded = named_children(elem);
                    if let [single] = embedded.as_slice() {
                        if single.kind() == "type_identifier" {
                            let name = self.text(*single).to_string();
                            self.embedded.entry(owner.to_string()).or_default().push(name);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_values(&mut self, spec: Node<'a>, is_const: bool) {
        let kind = if is_const {
            ObjectKind::Const
        } else {
            ObjectKind::Var
        };
        for (index, name_node) in field_children(spec, "name").into_iter().enumerate() {
            let name = self.text(name_node);
            let id = self.table.add_object(name, kind.clone(), self.pos(name_node));
            if name != "_" {
                self.package.insert(name.to_string(), id);
            }
            self.pending
                .push((self.file, Pending::Value { obj: id, spec, index }));
        }
    }

    // Pass 1b: field types, result types, package variable types.

    fn compute_signatures(&mut self) {
        self.compute_underlying();
        let pending = std::mem::take(&mut self.pending);
        for (file, item) in pending {
            self.file = file;
            match item {
                Pending::Field { obj, ty } => {
                    let ty = self.type_of(ty);
                    self.value_types.insert(obj, ty);
                }
                Pending::Signature { obj, decl } => {
                    self.scopes.push(Scope::new());
                    self.hide_type_params(decl);
                    let results = self.result_types(decl);
                    self.scopes.pop();
                    self.results.insert(obj, results);
                }
                Pending::Value { obj, spec, index } => {
                    let ty = match spec.child_by_field_name("type") {
                        Some(declared) => self.type_of(declared),
                        None => {
                            let values = expression_list(spec.child_by_field_name("value"));
                            let names = field_children(spec, "name").len();
                            self.assign_types(names, &values)
                                .into_iter()
                                .nth(index)
                                .unwrap_or_default()
                        }
                    };
                    self.value_types.insert(obj, ty);
                }
            }
        }
    }

    fn compute_underlying(&mut self) {
        let files: &'a [SourceFile] = self.files;
        for (idx, file) in files.iter().enumerate() {
            self.file = idx;
            for decl in named_children(file.root()) {
                if decl.kind() != "type_declaration" {
                    continue;
                }
                for spec in decl_specs(decl) {
                    let (Some(name), Some(ty)) = (
                        spec.child_by_field_name("name"),
                        spec.child_by_field_name("type"),
                    ) else {
                        continue;
                    };
                    if matches!(
                        ty.kind(),
                        "slice_type" | "array_type" | "map_type" | "channel_type"
                    ) {
                        let shape = self.type_of(ty);
                        self.underlying.insert(self.text(name).to_string(), shape);
                    }
                }
            }
        }
    }

    /// Shadow type parameter names (and generic receiver arguments) during signature typing
    fn hide_type_params(&mut self, decl: Node<'a>) {
        let mut hidden = Vec::new();
        if let Some(params) = decl.child_by_field_name("type_parameters") {
            for param in named_children(params) {
                hidden.extend(field_children(param, "name"));
            }
        }
        if decl.kind() == "method_declaration" {
            hidden.extend(receiver_type_args(decl));
        }
        for node in hidden {
            let name = self.text(node).to_string();
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert(name, None);
            }
        }
    }

    fn result_types(&self, decl: Node<'a>) -> Vec<Ty> {
        let Some(result) = decl.child_by_field_name("result") else {
            return Vec::new();
        };
        if result.kind() != "parameter_list" {
            return vec![self.type_of(result)];
        }
        let mut types = Vec::new();
        for param in named_children(result) {
            let Some(ty) = param.child_by_field_name("type") else {
                continue;
            };
            let ty = self.type_of(ty);
            let count = field_children(param, "name").len().max(1);
            types.extend(std::iter::repeat(ty).take(count));
        }
        types
    }

    // Pass 2: walk every declaration, recording uses and local definitions.

    fn resolve_bodies(&mut self) {
        let files: &'a [SourceFile] = self.files;
        for (idx, file) in files.iter().enumerate() {
            self.file = idx;
            for decl in named_children(file.root()) {
                match decl.kind() {
                    "function_declaration" | "method_declaration" => self.function(decl),
                    "type_declaration" => {
                        for spec in decl_specs(decl) {
                            self.scopes.push(Scope::new());
                            if let Some(params) = spec.child_by_field_name("type_parameters") {
                                self.declare_type_params(params);
                            }
                            if let Some(ty) = spec.child_by_field_name("type") {
                                self.walk(ty);
                            }
                            self.scopes.pop();
                        }
                    }
                    "const_declaration" | "var_declaration" => {
                        for spec in decl_specs(decl) {
                            if let Some(ty) = spec.child_by_field_name("type") {
                                self.walk(ty);
                            }
                            for value in expression_list(spec.child_by_field_name("value")) {
                                self.walk(value);
                            }
                        }
                    }
                    _ => {}
                }
            }
            debug_assert!(self.scopes.is_empty());
        }
    }

    fn function(&mut self, decl: Node<'a>) {
        self.scopes.push(Scope::new());
        if decl.kind() == "method_declaration" {
            self.receiver(decl);
        }
        if let Some(params) = decl.child_by_field_name("type_parameters") {
            self.declare_type_params(params);
        }
        self.signature(decl);
        if let Some(body) = decl.child_by_field_name("body") {
            // parameters and the outermost body block share one scope
            self.walk_children(body);
        }
        self.scopes.pop();
    }

    fn signature(&mut self, node: Node<'a>) {
        if let Some(params) = node.child_by_field_name("parameters") {
            self.declare_params(params);
        }
        if let Some(result) = node.child_by_field_name("result") {
            if result.kind() == "parameter_list" {
                self.declare_params(result);
            } else {
                self.walk(result);
            }
        }
    }

    fn receiver(&mut self, decl: Node<'a>) {
        for arg in receiver_type_args(decl) {
            self.declare_local(arg, Ty::Unknown);
        }
        let Some(ty) = receiver_type(decl) else {
            return;
        };
        let recv_ty = self.type_of(ty);
        if let Some(base) = base_type_node(ty) {
            self.resolve_use(base);
        }
        let Some(receiver) = decl.child_by_field_name("receiver") else {
            return;
        };
        for param in named_children(receiver) {
            for name in field_children(param, "name") {
                self.declare_local(name, recv_ty.clone());
            }
        }
    }

    fn declare_type_params(&mut self, list: Node<'a>) {
        let params = named_children(list);
        for param in &params {
            for name in field_children(*param, "name") {
                self.declare_local(name, Ty::Unknown);
            }
        }
        for param in params {
            if let Some(constraint) = param.child_by_field_name("type") {
                self.walk(constraint);
            }
        }
    }

    fn declare_params(&mut self, list: Node<'a>) {
        for param in named_children(list) {
            let Some(ty_node) = param.child_by_field_name("type") else {
                continue;
            };
            self.walk(ty_node);
            let mut ty = self.type_of(ty_node);
            if param.kind() == "variadic_parameter_declaration" {
                ty = Ty::Slice(Box::new(ty));
            }
            for name in field_children(param, "name") {
                self.declare_local(name, ty.clone());
            }
        }
    }

    fn declare_local(&mut self, name_node: Node, ty: Ty) -> Option<ObjectId> {
        let name = self.text(name_node);
        if name == "_" {
            return None;
        }
        let id = self
            .table
            .add_object(name, ObjectKind::Local, self.pos(name_node));
        self.value_types.insert(id, ty);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Some(id));
        }
        Some(id)
    }

    fn lookup(&self, name: &str) -> Option<ObjectId> {
        for scope in self.scopes.iter().rev() {
            if let Some(entry) = scope.get(name) {
                return *entry;
            }
        }
        if let Some(id) = self.imports.get(self.file).and_then(|m| m.get(name)) {
            return Some(*id);
        }
        self.package.get(name).copied()
    }

    fn resolve_use(&mut self, ident: Node) {
        let name = self.text(ident);
        if name == "_" {
            return;
        }
        if let Some(id) = self.lookup(name) {
            let pos = self.pos(ident);
            self.table.record_use(pos, id);
        }
    }

    fn walk_children(&mut self, node: Node<'a>) {
        for child in named_children(node) {
            self.walk(child);
        }
    }

    fn scoped(&mut self, node: Node<'a>) {
        self.scopes.push(Scope::new());
        self.walk_children(node);
        self.scopes.pop();
    }

    fn walk(&mut self, node: Node<'a>) {
        if self.depth >= MAX_NESTING {
            self.flat_scan(node);
            return;
        }
        self.depth += 1;
        self.walk_node(node);
        self.depth -= 1;
    }

    /// Record every identifier under `node` against the scopes open right now
    fn flat_scan(&mut self, node: Node<'a>) {
        if self.flattened.insert(self.file) {
            log::warn!(
                "{}: syntax nested deeper than {MAX_NESTING} levels, resolving identifiers lexically",
                self.files[self.file].path
            );
        }
        let mut cursor = node.walk();
        loop {
            let current = cursor.node();
            if matches!(current.kind(), "identifier" | "type_identifier") {
                self.resolve_use(current);
            }
            if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    fn walk_node(&mut self, node: Node<'a>) {
        match node.kind() {
            "identifier" | "type_identifier" => self.resolve_use(node),
            "field_identifier" | "package_identifier" | "label_name" | "qualified_type"
            | "interpreted_string_literal" | "raw_string_literal" | "import_declaration" => {}
            "selector_expression" => self.selector(node),
            "composite_literal" => self.composite_literal(node),
            "func_literal" => {
                self.scopes.push(Scope::new());
                self.signature(node);
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_children(body);
                }
                self.scopes.pop();
            }
            "parameter_list" => {
                for param in named_children(node) {
                    if let Some(ty) = param.child_by_field_name("type") {
                        self.walk(ty);
                    }
                }
            }
            "type_parameter_list" => self.declare_type_params(node),
            "block" | "for_statement" | "if_statement" | "expression_switch_statement"
            | "select_statement" | "expression_case" | "default_case"
            | "communication_case" => self.scoped(node),
            "type_switch_statement" => self.type_switch(node),
            "short_var_declaration" => self.short_var(node),
            "range_clause" => self.range_clause(node),
            "receive_statement" => self.receive(node),
            "const_declaration" | "var_declaration" => {
                for spec in decl_specs(node) {
                    self.local_values(spec);
                }
            }
            "type_declaration" => {
                for spec in decl_specs(node) {
                    self.local_type(spec);
                }
            }
            _ => self.walk_children(node),
        }
    }

    fn selector(&mut self, node: Node<'a>) {
        if let Some(operand) = node.child_by_field_name("operand") {
            self.walk(operand);
        }
        let (Some(field), Some(target)) = (node.child_by_field_name("field"), self.selector_target(node))
        else {
            return;
        };
        let pos = self.pos(field);
        self.table.record_use(pos, target);
    }

    /// Object a `x.f` selector denotes, if it belongs to this package
    fn selector_target(&self, node: Node<'a>) -> Option<ObjectId> {
        let operand = node.child_by_field_name("operand")?;
        let field = self.text(node.child_by_field_name("field")?);
        if operand.kind() == "identifier" {
            if let Some(id) = self.lookup(self.text(operand)) {
                if matches!(self.table.object(id).kind, ObjectKind::PkgName { .. }) {
                    return None;
                }
            }
        }
        if let Some(type_name) = self.type_operand(operand) {
            return self.member(&type_name, field, 0);
        }
        match self.expr_type(operand) {
            Ty::Named(type_name) => self.member(&type_name, field, 0),
            _ => None,
        }
    }

    /// `T` or `(*T)` used as the operand of a method expression
    fn type_operand(&self, node: Node<'a>) -> Option<String> {
        self.nested(|b| b.type_operand_node(node))
    }

    fn type_operand_node(&self, node: Node<'a>) -> Option<String> {
        match node.kind() {
            "identifier" | "type_identifier" => {
                let name = self.text(node);
                let id = self.lookup(name)?;
                matches!(self.table.object(id).kind, ObjectKind::TypeName).then(|| name.to_string())
            }
            "parenthesized_expression" | "parenthesized_type" | "pointer_type" => named_children(node)
                .into_iter()
                .next()
                .and_then(|inner| self.type_operand(inner)),
            "unary_expression" => {
                let op = node.child_by_field_name("operator")?;
                if self.text(op) != "*" {
                    return None;
                }
                self.type_operand(node.child_by_field_name("operand")?)
            }
            "generic_type" => self.type_operand(node.child_by_field_name("type")?),
            _ => None,
        }
    }

    /// Named type an alias chain ends at
    fn canonical<'n>(&'n self, mut type_name: &'n str) -> &'n str {
        for _ in 0..=MAX_EMBED_DEPTH {
            match self.aliases.get(type_name) {
                Some(target) => type_name = target,
                None => break,
            }
        }
        type_name
    }

    fn member(&self, type_name: &str, name: &str, depth: usize) -> Option<ObjectId> {
        if depth > MAX_EMBED_DEPTH {
            return None;
        }
        // methods may be declared on the alias name itself
        for owner in [type_name, self.canonical(type_name)] {
            let key = (owner.to_string(), name.to_string());
            if let Some(id) = self.methods.get(&key).or_else(|| self.fields.get(&key)) {
                return Some(*id);
            }
        }
        let type_name = self.canonical(type_name);
        self.embedded
            .get(type_name)?
            .iter()
            .find_map(|base| self.member(base, name, depth + 1))
    }

    fn composite_literal(&mut self, node: Node<'a>) {
        let ty = match node.child_by_field_name("type") {
            Some(ty_node) => {
                self.walk(ty_node);
                self.type_of(ty_node)
            }
            None => Ty::Unknown,
        };
        if let Some(body) = node.child_by_field_name("body") {
            self.literal_value(body, &ty);
        }
    }

    fn literal_value(&mut self, body: Node<'a>, ty: &Ty) {
        if self.depth >= MAX_NESTING {
            self.flat_scan(body);
            return;
        }
        self.depth += 1;
        let shape = self.structural(ty);
        let elem = shape.element();
        for child in named_children(body) {
            match child.kind() {
                "keyed_element" => self.keyed_element(child, &shape),
                "literal_element" | "literal_value" => self.literal_element(child, &elem),
                _ => self.walk(child),
            }
        }
        self.depth -= 1;
    }

    fn literal_element(&mut self, node: Node<'a>, ty: &Ty) {
        let node = unwrap_element(node);
        if node.kind() == "literal_value" {
            self.literal_value(node, ty);
        } else {
            self.walk(node);
        }
    }

    fn keyed_element(&mut self, node: Node<'a>, shape: &Ty) {
        let parts = named_children(node);
        let (Some(&key), Some(&value)) = (parts.first(), parts.get(1)) else {
            self.walk_children(node);
            return;
        };
        let key_ident = {
            let inner = unwrap_element(key);
            matches!(inner.kind(), "identifier" | "field_identifier").then_some(inner)
        };
        match shape {
            Ty::Map(key_ty, value_ty) => {
                self.literal_element(key, key_ty);
                self.literal_element(value, value_ty);
            }
            Ty::Slice(elem) => {
                self.literal_element(key, &Ty::Unknown);
                self.literal_element(value, elem);
            }
            Ty::Named(owner) if self.structs.contains(owner) => {
                let field = key_ident
                    .and_then(|k| self.fields.get(&(owner.clone(), self.text(k).to_string())))
                    .copied();
                let value_ty = match (field, key_ident) {
                    (Some(id), Some(k)) => {
                        let pos = self.pos(k);
                        self.table.record_use(pos, id);
                        self.value_types.get(&id).cloned().unwrap_or_default()
                    }
                    _ => Ty::Unknown,
                };
                self.literal_element(value, &value_ty);
            }
            _ => {
                // a bare key of an unknown literal type is taken to be a field name we cannot see
                if key_ident.is_none() {
                    self.literal_element(key, &Ty::Unknown);
                }
                self.literal_element(value, &Ty::Unknown);
            }
        }
    }

    fn short_var(&mut self, node: Node<'a>) {
        let values = expression_list(node.child_by_field_name("right"));
        for value in &values {
            self.walk(*value);
        }
        let names = expression_list(node.child_by_field_name("left"));
        let types = self.assign_types(names.len(), &values);
        for (name, ty) in names.into_iter().zip(types) {
            self.bind(name, ty);
        }
    }

    /// `:=` target: reuse a same-scope name, otherwise declare a new local
    fn bind(&mut self, name: Node<'a>, ty: Ty) {
        if name.kind() != "identifier" {
            self.walk(name);
            return;
        }
        let text = self.text(name);
        let existing = self.scopes.last().and_then(|s| s.get(text).copied());
        match existing {
            Some(Some(id)) => {
                let pos = self.pos(name);
                self.table.record_use(pos, id);
            }
            _ => {
                self.declare_local(name, ty);
            }
        }
    }

    fn range_clause(&mut self, node: Node<'a>) {
        let right = node.child_by_field_name("right");
        if let Some(right) = right {
            self.walk(right);
        }
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if !has_token(node, ":=") {
            self.walk(left);
            return;
        }
        let ranged = right
            .map(|r| self.expr_type(r))
            .map(|t| self.structural(&t))
            .unwrap_or_default();
        let types = match ranged {
            Ty::Slice(elem) => vec![Ty::Unknown, *elem],
            Ty::Map(key, value) => vec![*key, *value],
            Ty::Chan(elem) => vec![*elem],
            _ => Vec::new(),
        };
        for (idx, name) in expression_list(Some(left)).into_iter().enumerate() {
            self.bind(name, types.get(idx).cloned().unwrap_or_default());
        }
    }

    fn receive(&mut self, node: Node<'a>) {
        let right = node.child_by_field_name("right");
        if let Some(right) = right {
            self.walk(right);
        }
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if !has_token(node, ":=") {
            self.walk(left);
            return;
        }
        let received = right.map(|r| self.expr_type(r)).unwrap_or_default();
        for (idx, name) in expression_list(Some(left)).into_iter().enumerate() {
            let ty = if idx == 0 { received.clone() } else { Ty::Unknown };
            self.bind(name, ty);
        }
    }

    fn type_switch(&mut self, node: Node<'a>) {
        self.scopes.push(Scope::new());
        if let Some(init) = node.child_by_field_name("initializer") {
            self.walk(init);
        }
        let value = node.child_by_field_name("value");
        if let Some(value) = value {
            self.walk(value);
        }
        let switched = value.map(|v| self.expr_type(v)).unwrap_or_default();

        let alias = node
            .child_by_field_name("alias")
            .and_then(|a| expression_list(Some(a)).into_iter().next())
            .filter(|a| a.kind() == "identifier" && self.text(*a) != "_");
        let alias = alias.map(|a| {
            let name = self.text(a);
            (name, self.table.add_object(name, ObjectKind::Local, self.pos(a)))
        });

        for case in named_children(node) {
            if !matches!(case.kind(), "type_case" | "default_case") {
                continue;
            }
            self.scopes.push(Scope::new());
            let case_types = field_children(case, "type");
            for ty in &case_types {
                self.walk(*ty);
            }
            if let Some((name, id)) = alias {
                let ty = match case_types.as_slice() {
                    [single] => self.type_of(*single),
                    _ => switched.clone(),
                };
                self.value_types.insert(id, ty);
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.to_string(), Some(id));
                }
            }
            for stmt in named_children(case) {
                if !case_types.contains(&stmt) {
                    self.walk(stmt);
                }
            }
            self.scopes.pop();
        }
        self.scopes.pop();
    }

    fn local_values(&mut self, spec: Node<'a>) {
        let declared = spec.child_by_field_name("type");
        if let Some(ty) = declared {
            self.walk(ty);
        }
        let values = expression_list(spec.child_by_field_name("value"));
        for value in &values {
            self.walk(*value);
        }
        let names = field_children(spec, "name");
        let types = match declared {
            Some(ty) => vec![self.type_of(ty); names.len()],
            None => self.assign_types(names.len(), &values),
        };
        for (name, ty) in names.into_iter().zip(types) {
            self.declare_local(name, ty);
        }
    }

    fn local_type(&mut self, spec: Node<'a>) {
        if let Some(name) = spec.child_by_field_name("name") {
            self.declare_local(name, Ty::Unknown);
        }
        self.scopes.push(Scope::new());
        if let Some(params) = spec.child_by_field_name("type_parameters") {
            self.declare_type_params(params);
        }
        if let Some(ty) = spec.child_by_field_name("type") {
            self.walk(ty);
        }
        self.scopes.pop();
    }

    // Static typing

    /// Types of the `count` targets of an assignment from `values`
    fn assign_types(&self, count: usize, values: &[Node<'a>]) -> Vec<Ty> {
        let mut types: Vec<Ty> = if values.len() == count {
            values.iter().map(|v| self.expr_type(*v)).collect()
        } else if let [single] = values {
            if single.kind() == "call_expression" {
                self.call_results(*single)
            } else {
                // comma-ok forms: m[k], x.(T), <-ch
                vec![self.expr_type(*single)]
            }
        } else {
            Vec::new()
        };
        types.resize(count, Ty::Unknown);
        types
    }

    fn structural(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Named(name) => {
                let name = self.canonical(name);
                if self.structs.contains(name) {
                    return Ty::Named(name.to_string());
                }
                self.underlying
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Ty::Named(name.to_string()))
            }
            _ => ty.clone(),
        }
    }

    /// One typing step a level deeper; past [`MAX_NESTING`] the answer is unknown
    fn nested<T: Default>(&self, step: impl FnOnce(&Self) -> T) -> T {
        let depth = self.typing_depth.get();
        if depth >= MAX_NESTING {
            return T::default();
        }
        self.typing_depth.set(depth + 1);
        let out = step(self);
        self.typing_depth.set(depth);
        out
    }

    fn type_of(&self, node: Node<'a>) -> Ty {
        self.nested(|b| b.type_of_node(node))
    }

    fn type_of_node(&self, node: Node<'a>) -> Ty {
        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = self.text(node);
                match self.lookup(name) {
                    Some(id) if self.table.object(id).kind == ObjectKind::TypeName => {
                        Ty::Named(name.to_string())
                    }
                    _ => Ty::Unknown,
                }
            }
            "pointer_type" | "parenthesized_type" => named_children(node)
                .into_iter()
                .next()
                .map(|inner| self.type_of(inner))
                .unwrap_or_default(),
            "generic_type" => node
                .child_by_field_name("type")
                .map(|inner| self.type_of(inner))
                .unwrap_or_default(),
            "slice_type" | "array_type" | "implicit_length_array_type" => {
                let elem = node
                    .child_by_field_name("element")
                    .map(|e| self.type_of(e))
                    .unwrap_or_default();
                Ty::Slice(Box::new(elem))
            }
            "map_type" => {
                let key = node
                    .child_by_field_name("key")
                    .map(|k| self.type_of(k))
                    .unwrap_or_default();
                let value = node
                    .child_by_field_name("value")
                    .map(|v| self.type_of(v))
                    .unwrap_or_default();
                Ty::Map(Box::new(key), Box::new(value))
            }
            "channel_type" => {
                let value = node
                    .child_by_field_name("value")
                    .map(|v| self.type_of(v))
                    .unwrap_or_default();
                Ty::Chan(Box::new(value))
            }
            _ => Ty::Unknown,
        }
    }

    fn expr_type(&self, node: Node<'a>) -> Ty {
        self.nested(|b| b.expr_type_node(node))
    }

    fn expr_type_node(&self, node: Node<'a>) -> Ty {
        match node.kind() {
            "identifier" => {
                let Some(id) = self.lookup(self.text(node)) else {
                    return Ty::Unknown;
                };
                self.value_types.get(&id).cloned().unwrap_or_default()
            }
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .next()
                .map(|inner| self.expr_type(inner))
                .unwrap_or_default(),
            "unary_expression" => {
                let Some(operand) = node.child_by_field_name("operand") else {
                    return Ty::Unknown;
                };
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                match op {
                    "&" | "*" => self.expr_type(operand),
                    "<-" => self.structural(&self.expr_type(operand)).element(),
                    _ => Ty::Unknown,
                }
            }
            "composite_literal" => node
                .child_by_field_name("type")
                .map(|ty| self.type_of(ty))
                .unwrap_or_default(),
            "call_expression" => self.call_results(node).into_iter().next().unwrap_or_default(),
            "selector_expression" => match self.selector_target(node) {
                Some(id) if matches!(self.table.object(id).kind, ObjectKind::Field { .. }) => {
                    self.value_types.get(&id).cloned().unwrap_or_default()
                }
                _ => Ty::Unknown,
            },
            "index_expression" => node
                .child_by_field_name("operand")
                .map(|operand| self.structural(&self.expr_type(operand)).element())
                .unwrap_or_default(),
            "slice_expression" => node
                .child_by_field_name("operand")
                .map(|operand| self.expr_type(operand))
                .unwrap_or_default(),
            "type_assertion_expression" | "type_conversion_expression" => node
                .child_by_field_name("type")
                .map(|ty| self.type_of(ty))
                .unwrap_or_default(),
            _ => Ty::Unknown,
        }
    }

    fn call_results(&self, call: Node<'a>) -> Vec<Ty> {
        let Some(function) = call.child_by_field_name("function") else {
            return Vec::new();
        };
        let callee = match function.kind() {
            "identifier" => {
                let name = self.text(function);
                match self.lookup(name) {
                    Some(id) => Some(id),
                    None if name == "new" || name == "make" => {
                        let arg = call
                            .child_by_field_name("arguments")
                            .and_then(|args| named_children(args).into_iter().next());
                        return arg.map(|a| vec![self.type_of(a)]).unwrap_or_default();
                    }
                    None => None,
                }
            }
            "selector_expression" => self.selector_target(function),
            // F[T](...) with explicit instantiation
            "index_expression" | "generic_type" => function
                .child_by_field_name("operand")
                .or_else(|| function.child_by_field_name("type"))
                .filter(|f| f.kind() == "identifier" || f.kind() == "type_identifier")
                .and_then(|f| self.lookup(self.text(f))),
            "parenthesized_expression" => {
                return self
                    .type_operand(function)
                    .map(|t| vec![Ty::Named(t)])
                    .unwrap_or_default();
            }
            _ => None,
        };
        let Some(id) = callee else {
            return Vec::new();
        };
        let object = self.table.object(id);
        match &object.kind {
            ObjectKind::TypeName => vec![Ty::Named(object.name.clone())],
            _ => self.results.get(&id).cloned().unwrap_or_default(),
        }
    }
}

/// Package name an import path binds when it has no explicit alias
fn import_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    let is_major_version =
        |s: &str| s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit());
    if is_major_version(last) {
        last = segments.next().unwrap_or(last);
    }
    let last = last.split('.').next().unwrap_or(last);
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.strip_suffix("-go").unwrap_or(last);
    last.replace('-', "_")
}

fn expression_list(node: Option<Node>) -> Vec<Node> {
    match node {
        Some(list) if list.kind() == "expression_list" => named_children(list),
        Some(single) => vec![single],
        None => Vec::new(),
    }
}

fn unwrap_element(node: Node) -> Node {
    if node.kind() == "literal_element" {
        if let Some(inner) = named_children(node).into_iter().next() {
            return inner;
        }
    }
    node
}

/// Type-argument identifiers of a generic receiver such as `*Stack[T]`
fn receiver_type_args(method: Node) -> Vec<Node> {
    let mut ty = receiver_type(method);
    while let Some(node) = ty {
        match node.kind() {
            "pointer_type" | "parenthesized_type" => ty = named_children(node).into_iter().next(),
            "generic_type" => {
                let Some(args) = node.child_by_field_name("type_arguments") else {
                    return Vec::new();
                };
                let mut out = Vec::new();
                collect_identifiers(args, &mut out);
                return out;
            }
            _ => return Vec::new(),
        }
    }
    Vec::new()
}

fn collect_identifiers<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in named_children(node) {
        match child.kind() {
            "type_identifier" | "identifier" => out.push(child),
            _ => collect_identifiers(child, out),
        }
    }
}

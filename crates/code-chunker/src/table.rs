//! Type-resolution table for one compilation unit.
//!
//! Every identifier occurrence the resolver understands is recorded either as a
//! definition (`defs`) or as a use (`uses`) of an [`Object`]. The table is built once
//! per unit by [`crate::resolve::build_table`] and is read-only afterwards.

use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Index of a file inside its unit
pub type FileId = usize;

/// Handle of an object inside one [`TypeTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

/// Source position of an identifier occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub file: FileId,
    /// 1-based line
    pub line: usize,
    /// Byte offset of the identifier's first byte
    pub offset: usize,
}

/// What an identifier denotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Package-level function (including `init`)
    Func,
    /// Method bound to the named receiver base type
    Method { receiver: String },
    /// Package-level named type
    TypeName,
    /// Package-level constant
    Const,
    /// Package-level variable
    Var,
    /// Struct field of the named owner type
    Field { owner: String },
    /// Method element of the named interface type
    InterfaceMethod { owner: String },
    /// Imported package name (file scope)
    PkgName { path: String },
    /// Anything declared inside a function or type body: parameters, results,
    /// receivers, type parameters, block-level vars/consts/types
    Local,
}

impl ObjectKind {
    /// Objects declared in package scope
    #[must_use]
    pub const fn is_package_level(&self) -> bool {
        matches!(
            self,
            Self::Func | Self::Method { .. } | Self::TypeName | Self::Const | Self::Var
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Position of the defining identifier
    pub pos: Position,
}

/// An identifier use resolved to its object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub pos: Position,
    pub object: ObjectId,
}

/// Identifier → object tables for one unit
#[derive(Debug, Default)]
pub struct TypeTable {
    objects: Vec<Object>,
    defs: HashMap<(FileId, usize), ObjectId>,
    /// Kept sorted by position once the table is finished
    uses: Vec<Occurrence>,
}

impl TypeTable {
    pub(crate) fn add_object(&mut self, name: impl Into<String>, kind: ObjectKind, pos: Position) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(Object {
            name: name.into(),
            kind,
            pos,
        });
        self.defs.insert((pos.file, pos.offset), id);
        id
    }

    pub(crate) fn record_use(&mut self, pos: Position, object: ObjectId) {
        self.uses.push(Occurrence { pos, object });
    }

    pub(crate) fn finish(mut self) -> Self {
        self.uses.sort_by_key(|occ| occ.pos);
        self.uses.dedup_by_key(|occ| occ.pos);
        self
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.0]
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(idx, obj)| (ObjectId(idx), obj))
    }

    /// Object defined by the identifier starting at `offset`
    pub fn def_at(&self, file: FileId, offset: usize) -> Option<ObjectId> {
        self.defs.get(&(file, offset)).copied()
    }

    /// Object used by the identifier starting at `offset`
    pub fn use_at(&self, file: FileId, offset: usize) -> Option<ObjectId> {
        let idx = self
            .uses
            .binary_search_by(|occ| (occ.pos.file, occ.pos.offset).cmp(&(file, offset)))
            .ok()?;
        Some(self.uses[idx].object)
    }

    /// First package-level object named `name` whose defining identifier lies in `file`
    /// within `lines`, optionally narrowed by a kind predicate
    pub fn defining(
        &self,
        file: FileId,
        name: &str,
        lines: RangeInclusive<usize>,
        accept: impl Fn(&ObjectKind) -> bool,
    ) -> Option<ObjectId> {
        self.objects()
            .filter(|(_, obj)| {
                obj.pos.file == file
                    && obj.name == name
                    && lines.contains(&obj.pos.line)
                    && obj.kind.is_package_level()
                    && accept(&obj.kind)
            })
            .min_by_key(|(_, obj)| obj.pos.offset)
            .map(|(id, _)| id)
    }

    /// Uses in `file` whose line falls within `lines`, in source order
    pub fn uses_in(&self, file: FileId, lines: RangeInclusive<usize>) -> &[Occurrence] {
        let (start, end) = (*lines.start(), *lines.end());
        let lo = self
            .uses
            .partition_point(|occ| (occ.pos.file, occ.pos.line) < (file, start));
        let hi = self
            .uses
            .partition_point(|occ| (occ.pos.file, occ.pos.line) <= (file, end));
        &self.uses[lo..hi.max(lo)]
    }

    /// Uses in every file of the unit whose line falls within `lines`, by file then source order
    pub fn uses_on_lines(&self, lines: RangeInclusive<usize>) -> Vec<&Occurrence> {
        let mut found = Vec::new();
        let mut next = 0;
        while let Some(first) = self.uses.get(next) {
            let file = first.pos.file;
            found.extend(self.uses_in(file, lines.clone()));
            next += self.uses[next..].partition_point(|occ| occ.pos.file == file);
        }
        found
    }

    pub fn uses(&self) -> &[Occurrence] {
        &self.uses
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(file: FileId, line: usize, offset: usize) -> Position {
        Position { file, line, offset }
    }

    #[test]
    fn uses_in_selects_file_and_line_window() {
        let mut table = TypeTable::default();
        let obj = table.add_object("Store", ObjectKind::TypeName, pos(0, 1, 5));
        table.record_use(pos(0, 3, 40), obj);
        table.record_use(pos(0, 7, 90), obj);
        table.record_use(pos(1, 3, 12), obj);
        table.record_use(pos(0, 5, 60), obj);
        let table = table.finish();

        let lines: Vec<usize> = table.uses_in(0, 3..=5).iter().map(|o| o.pos.line).collect();
        assert_eq!(lines, vec![3, 5]);
        assert_eq!(table.uses_in(1, 1..=10).len(), 1);
        assert!(table.uses_in(2, 1..=10).is_empty());
    }

    #[test]
    fn uses_on_lines_spans_every_file() {
        let mut table = TypeTable::default();
        let obj = table.add_object("Store", ObjectKind::TypeName, pos(0, 1, 5));
        table.record_use(pos(2, 4, 30), obj);
        table.record_use(pos(0, 9, 90), obj);
        table.record_use(pos(1, 3, 12), obj);
        table.record_use(pos(0, 4, 40), obj);
        table.record_use(pos(1, 6, 50), obj);
        let table = table.finish();

        let found: Vec<(FileId, usize)> = table
            .uses_on_lines(3..=5)
            .iter()
            .map(|o| (o.pos.file, o.pos.line))
            .collect();
        assert_eq!(found, vec![(0, 4), (1, 3), (2, 4)]);
        assert!(table.uses_on_lines(20..=30).is_empty());
    }

    #[test]
    fn defining_ignores_locals_and_other_files() {
        let mut table = TypeTable::default();
        let local = table.add_object("Save", ObjectKind::Local, pos(0, 2, 10));
        let method = table.add_object(
            "Save",
            ObjectKind::Method {
                receiver: "Store".into(),
            },
            pos(0, 4, 30),
        );
        table.add_object("Save", ObjectKind::Func, pos(1, 4, 30));
        let table = table.finish();

        assert_eq!(table.defining(0, "Save", 1..=9, |_| true), Some(method));
        assert_eq!(
            table.defining(0, "Save", 1..=9, |k| matches!(k, ObjectKind::Func)),
            None
        );
        assert_eq!(table.def_at(0, 10), Some(local));
    }

    #[test]
    fn use_at_finds_exact_offset() {
        let mut table = TypeTable::default();
        let obj = table.add_object("x", ObjectKind::Var, pos(0, 1, 4));
        table.record_use(pos(0, 2, 20), obj);
        let table = table.finish();
        assert_eq!(table.use_at(0, 20), Some(obj));
        assert_eq!(table.use_at(0, 21), None);
    }
}

use crate::table::{FileId, ObjectId, ObjectKind, TypeTable};
use crate::types::{Chunk, ChunkKind};
use std::collections::{HashMap, HashSet};

/// Unit-scoped `object → FQN` map
#[derive(Debug, Default)]
pub struct IdentityMap {
    fqns: HashMap<ObjectId, String>,
}

impl IdentityMap {
    /// Bind every chunk's defining object to the chunk's FQN.
    ///
    /// Chunks whose defining identifier cannot be found (blank names, unnamed receivers)
    /// simply get no entry. Two declarations with the same FQN both stay mapped.
    pub fn assign<'c>(
        table: &TypeTable,
        chunks: impl IntoIterator<Item = (FileId, &'c Chunk)>,
    ) -> Self {
        let mut fqns = HashMap::new();
        let mut seen = HashSet::new();

        for (file, chunk) in chunks {
            if chunk.name.is_empty() {
                continue;
            }
            let lines = chunk.start_line..=chunk.end_line;
            let found = table.defining(file, &chunk.name, lines, |kind| {
                defines(chunk.kind, &chunk.receiver_name, kind)
            });
            let Some(object) = found else {
                log::debug!(
                    "No defining object for {} at {}:{}",
                    chunk.fqn(),
                    chunk.file_path,
                    chunk.start_line
                );
                continue;
            };

            let fqn = chunk.fqn();
            if !seen.insert(fqn.clone()) {
                log::debug!("Duplicate FQN {fqn} in {}", chunk.file_path);
            }
            fqns.insert(object, fqn);
        }

        Self { fqns }
    }

    pub fn fqn(&self, object: ObjectId) -> Option<&str> {
        self.fqns.get(&object).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fqns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fqns.is_empty()
    }
}

/// Whether a table object can be the declaration a chunk of `kind` was cut from
fn defines(kind: ChunkKind, receiver: &str, object: &ObjectKind) -> bool {
    match (kind, object) {
        (ChunkKind::Function | ChunkKind::Test, ObjectKind::Func) => true,
        (ChunkKind::Method, ObjectKind::Method { receiver: r }) => r == receiver,
        (
            ChunkKind::StructuredType | ChunkKind::InterfaceType | ChunkKind::TypeAlias,
            ObjectKind::TypeName,
        ) => true,
        (ChunkKind::ConstGroup, ObjectKind::Const) => true,
        (ChunkKind::VarGroup, ObjectKind::Var) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_analyzer::AstAnalyzer;
    use crate::config::ChunkerConfig;
    use crate::resolve::build_table;
    use crate::syntax::GoParser;

    #[test]
    fn maps_declarations_to_fqns() {
        let src = "package rag

type Store struct{}

func (s *Store) Save() {}

func Save() {}

var _ = 1
";
        let mut parser = GoParser::new().unwrap();
        let files = vec![parser.parse("rag/store.go", src.to_string(), 0).unwrap()];
        let table = build_table(&files);
        let chunks = AstAnalyzer::new(ChunkerConfig::default())
            .extract(&files[0], "rag")
            .unwrap();
        let identities = IdentityMap::assign(&table, chunks.iter().map(|c| (0, c)));

        let mut fqns: Vec<&str> = table
            .objects()
            .filter_map(|(id, _)| identities.fqn(id))
            .collect();
        fqns.sort_unstable();
        assert_eq!(fqns, vec!["rag.(Store).Save", "rag.Save", "rag.Store"]);
        assert_eq!(identities.len(), 3);
    }
}

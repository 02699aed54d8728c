use crate::identity::IdentityMap;
use crate::table::TypeTable;
use crate::types::Chunk;
use std::collections::BTreeSet;

/// FQNs of same-unit declarations used inside the chunk's line window, sorted and deduplicated.
///
/// The window is applied to every file of the unit, not only the chunk's own file.
pub fn resolve_references(table: &TypeTable, identities: &IdentityMap, chunk: &Chunk) -> Vec<String> {
    let own = chunk.fqn();
    let mut refs = BTreeSet::new();

    for occurrence in table.uses_on_lines(chunk.start_line..=chunk.end_line) {
        let Some(fqn) = identities.fqn(occurrence.object) else {
            continue;
        };
        if fqn != own {
            refs.insert(fqn.to_string());
        }
    }

    refs.into_iter().collect()
}

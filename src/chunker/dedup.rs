//! Exact-content deduplication for chunks extracted from the same file.
//!
//! Macro-generated or heavily templated code can produce several AST
//! definitions with byte-identical bodies (e.g. derive-expanded impls in
//! languages that don't expand macros before parsing). Keeping every
//! duplicate would waste embedding calls and inflate the index with
//! indistinguishable near-neighbors, so only the first occurrence survives.

use std::collections::HashSet;

use super::Chunk;

/// Remove chunks whose content hash has already been seen, preserving the
/// order and all other chunks. The first chunk with a given hash wins.
pub fn dedup_exact(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut seen: HashSet<String> = HashSet::with_capacity(chunks.len());
    chunks
        .into_iter()
        .filter(|c| seen.insert(c.hash.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkKind;

    #[test]
    fn removes_exact_duplicates_keeping_first() {
        let a = Chunk::new(
            "fn foo() {}".to_string(),
            0,
            0,
            ChunkKind::Function,
            "a.rs".to_string(),
        );
        let b = Chunk::new(
            "fn foo() {}".to_string(),
            10,
            10,
            ChunkKind::Function,
            "a.rs".to_string(),
        );
        let c = Chunk::new(
            "fn bar() {}".to_string(),
            20,
            20,
            ChunkKind::Function,
            "a.rs".to_string(),
        );

        let deduped = dedup_exact(vec![a, b, c]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].start_line, 0);
        assert_eq!(deduped[1].content, "fn bar() {}");
    }
}

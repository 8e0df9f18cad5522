use prism::chunker::{Chunk, ChunkKind};
use prism::{cache::FileMetaStore, embed::EmbeddedChunk, fts::FtsStore, vectordb::VectorStore};
use std::path::Path;
use tempfile::TempDir;

fn embedded(path: &str, content: &str, seed: f32) -> EmbeddedChunk {
    let chunk = Chunk::new(content.to_string(), 0, 1, ChunkKind::Function, path.to_string());
    EmbeddedChunk::new(chunk, vec![seed; 4])
}

/// Scenario 2: indexing the same unchanged tree twice with incremental=true
/// skips every file and adds zero chunks.
#[test]
fn unchanged_rebuild_adds_nothing() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join(".prism.db");
    let src_path = tmp.path().join("a.rs");
    std::fs::write(&src_path, "fn a() {}\n").unwrap();

    let mut file_meta = FileMetaStore::new("test-model".to_string(), 4);
    let mut store = VectorStore::new(&db_path, 4).unwrap();
    let mut fts = FtsStore::new_with_writer(&db_path).unwrap();

    let (needs_reindex, _) = file_meta.check_file(&src_path).unwrap();
    assert!(needs_reindex, "first sighting of a file must require indexing");

    let ids = store
        .insert_chunks_with_ids(vec![embedded("a.rs", "fn a() {}", 1.0)])
        .unwrap();
    for id in &ids {
        fts.add_chunk(*id, "fn a() {}", "a.rs", None, "Function").unwrap();
    }
    file_meta.update_file(&src_path, ids).unwrap();
    fts.commit().unwrap();
    file_meta.save(&db_path).unwrap();

    // Second pass over the same, byte-identical file.
    let (needs_reindex_again, old_ids) = file_meta.check_file(&src_path).unwrap();
    assert!(!needs_reindex_again, "unchanged bytes must not trigger reindex");
    assert_eq!(old_ids.len(), 1);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_chunks, 1);
}

/// Scenario 4: a file that was tracked but no longer exists on disk is
/// detected as deleted, its chunks are tombstoned in both stores, and it
/// drops out of search entirely.
#[test]
fn deleted_file_is_removed_from_search() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join(".prism.db");
    let old_path = tmp.path().join("old.ts");
    std::fs::write(&old_path, "export function old() {}\n").unwrap();

    let mut file_meta = FileMetaStore::new("test-model".to_string(), 4);
    let mut store = VectorStore::new(&db_path, 4).unwrap();
    let mut fts = FtsStore::new_with_writer(&db_path).unwrap();

    let ids = store
        .insert_chunks_with_ids(vec![embedded("old.ts", "export function old() {}", 1.0)])
        .unwrap();
    for id in &ids {
        fts.add_chunk(*id, "export function old() {}", "old.ts", None, "Function")
            .unwrap();
    }
    file_meta.update_file(&old_path, ids).unwrap();
    fts.commit().unwrap();

    // Simulate the next walk not finding old.ts any more.
    std::fs::remove_file(&old_path).unwrap();
    let deleted = file_meta.find_deleted_files();
    assert_eq!(deleted.len(), 1);
    let (deleted_path, chunk_ids) = &deleted[0];
    assert!(deleted_path.ends_with("old.ts"));
    assert_eq!(chunk_ids.len(), 1);

    let removed = store.delete_chunks(chunk_ids).unwrap();
    assert_eq!(removed, 1);
    for id in chunk_ids {
        fts.delete_chunk(*id).unwrap();
    }
    file_meta.remove_file(Path::new(deleted_path));

    let results = store.search(&[1.0, 1.0, 1.0, 1.0], 10).unwrap();
    assert!(results.is_empty());
    assert!(file_meta.find_deleted_files().is_empty());
}

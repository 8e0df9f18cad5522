//! Vector-DB facade: binds the SQLite metadata store and the HNSW index
//! into the single entry point the rest of prism talks to for inserting,
//! searching, and deleting embedded chunks.
//!
//! External callers keep using dense `u32` chunk ids — the facade bridges
//! those to the content-addressed `String` chunk ids that are the actual
//! primary key in the metadata store and the external id in the HNSW
//! graph, via SQLite's `rowid`. This keeps the full-text index and the
//! file-metadata cache (both still u32-keyed) working unchanged.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{HNSW_DIR_NAME, HNSW_GRAPH_FILE, HNSW_SIDECAR_FILE, METADATA_DB_NAME};
use crate::embed::EmbeddedChunk;
use crate::error::{PrismError, Result};
use crate::file::Language;
use crate::hnsw::{HnswIndex, HnswParams};
use crate::store::{ChunkRecord, FileRecord, MetadataStore};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Filters and paging applied to a `search()` call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub path_filter: Option<String>,
    pub language_filter: Option<String>,
    pub min_relevance: Option<f32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            path_filter: None,
            language_filter: None,
            min_relevance: None,
        }
    }
}

/// Search result with metadata.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: u32,
    pub content: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: String,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub context: Option<String>,
    pub hash: String,
    pub distance: f32,
    pub score: f32,
    pub context_prev: Option<String>,
    pub context_next: Option<String>,
}

/// Statistics about the vector store.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub total_files: usize,
    pub indexed: bool,
    pub dimensions: usize,
}

fn record_to_search_result(record: &ChunkRecord, score: f32, distance: f32) -> SearchResult {
    SearchResult {
        id: record.surrogate_id as u32,
        content: record.content.clone(),
        path: record.file_path.clone(),
        start_line: record.start_line,
        end_line: record.end_line,
        kind: record.kind.clone(),
        signature: record.signature.clone(),
        docstring: record.docstring.clone(),
        context: if record.context.is_empty() {
            None
        } else {
            Some(record.context.join(" > "))
        },
        hash: record.checksum.clone(),
        distance,
        score,
        context_prev: None,
        context_next: None,
    }
}

fn embedded_chunk_to_record(chunk: &EmbeddedChunk) -> ChunkRecord {
    let c = &chunk.chunk;
    ChunkRecord {
        surrogate_id: 0,
        id: c.id.clone(),
        file_path: c.path.clone(),
        start_line: c.start_line,
        end_line: c.end_line,
        kind: format!("{:?}", c.kind),
        content: c.content.clone(),
        checksum: c.hash.clone(),
        signature: c.signature.clone(),
        docstring: c.docstring.clone(),
        context: c.context.clone(),
        symbols: c.symbols.clone(),
        imports: c.imports.clone(),
        exports: c.exports.clone(),
        dependencies: c.dependencies.clone(),
        embedding: Some(chunk.embedding.clone()),
        created_at: now_ms(),
        access_count: 0,
        deleted_at: None,
    }
}

/// multi-factor relevance weights, in the order s_sem/s_prox/s_sym/s_rec/s_freq
const WEIGHT_SEMANTIC: f32 = 0.40;
const WEIGHT_PROXIMITY: f32 = 0.25;
const WEIGHT_SYMBOL: f32 = 0.20;
const WEIGHT_RECENCY: f32 = 0.10;
const WEIGHT_FREQUENCY: f32 = 0.05;
/// `s_freq` is reserved for future access-frequency weighting; prism has
/// no long-running access log yet, so it's a flat constant.
const FREQUENCY_SCORE_PLACEHOLDER: f32 = 0.5;

fn path_proximity_score(path: &str) -> f32 {
    let lower = path.to_lowercase();
    if lower.contains("/src/") || lower.contains("/lib/") || lower.contains("/components/") || lower.contains("/utils/") || lower.contains("/services/") {
        1.0
    } else if lower.contains("/test/") || lower.contains("/tests/") {
        0.7
    } else if lower.ends_with(".json") || lower.ends_with(".toml") || lower.ends_with(".yaml") || lower.ends_with(".yml") || lower.contains("config") {
        0.6
    } else {
        0.8
    }
}

fn symbol_presence_score(symbols: &[String]) -> f32 {
    if symbols.is_empty() {
        0.5
    } else {
        1.0
    }
}

fn recency_score(created_at_ms: u64, now: u64) -> f32 {
    let age_days = now.saturating_sub(created_at_ms) as f64 / (1000.0 * 60.0 * 60.0 * 24.0);
    (0.9f64.powf(age_days / 30.0)).max(0.1) as f32
}

/// Combine HNSW's cosine score with path/symbol/recency/frequency signals
/// into the final relevance score used to rank and filter results.
fn relevance_score(semantic: f32, record: &ChunkRecord, now: u64) -> f32 {
    let s_prox = path_proximity_score(&record.file_path);
    let s_sym = symbol_presence_score(&record.symbols);
    let s_rec = recency_score(record.created_at, now);

    WEIGHT_SEMANTIC * semantic
        + WEIGHT_PROXIMITY * s_prox
        + WEIGHT_SYMBOL * s_sym
        + WEIGHT_RECENCY * s_rec
        + WEIGHT_FREQUENCY * FREQUENCY_SCORE_PLACEHOLDER
}

/// Binds a [`MetadataStore`] and an [`HnswIndex`] into a single vector
/// database. Insert order is metadata-then-HNSW so a crash between the two
/// only ever leaves an orphaned HNSW entry (dropped on next open), never a
/// dangling metadata row with no vector.
pub struct VectorStore {
    metadata: MetadataStore,
    hnsw: HnswIndex,
    dimensions: usize,
    hnsw_index_path: PathBuf,
    hnsw_mapping_path: PathBuf,
    indexed: bool,
}

impl VectorStore {
    pub fn new(db_path: &Path, dimensions: usize) -> Result<Self> {
        std::fs::create_dir_all(db_path).map_err(|e| PrismError::io(db_path, e.to_string()))?;

        let metadata_path = db_path.join(METADATA_DB_NAME);
        let metadata = MetadataStore::open(&metadata_path, dimensions)?;

        let hnsw_dir = db_path.join(HNSW_DIR_NAME);
        std::fs::create_dir_all(&hnsw_dir).map_err(|e| PrismError::io(&hnsw_dir, e.to_string()))?;
        let hnsw_index_path = hnsw_dir.join(HNSW_GRAPH_FILE);
        let hnsw_mapping_path = hnsw_dir.join(HNSW_SIDECAR_FILE);

        let params = HnswParams {
            dimension: dimensions,
            ..Default::default()
        };
        let hnsw = if hnsw_mapping_path.exists() {
            HnswIndex::load(&hnsw_index_path, &hnsw_mapping_path, params).unwrap_or_else(|_| HnswIndex::new(params))
        } else {
            HnswIndex::new(params)
        };

        let mut store = Self {
            metadata,
            hnsw,
            dimensions,
            hnsw_index_path,
            hnsw_mapping_path,
            indexed: false,
        };
        store.reconcile_hnsw_with_metadata()?;
        Ok(store)
    }

    /// Open for read-only workloads. Reconciliation still runs (it only
    /// touches the in-memory HNSW tombstone set, never the files on disk).
    pub fn open_readonly(db_path: &Path, dimensions: usize) -> Result<Self> {
        Self::new(db_path, dimensions)
    }

    /// Drop HNSW entries with no corresponding live metadata row, and
    /// lazily re-insert live chunks that have an embedding but are missing
    /// from the graph — both can happen if a prior run crashed between
    /// the metadata commit and the HNSW mutation.
    fn reconcile_hnsw_with_metadata(&mut self) -> Result<()> {
        for external_id in self.hnsw.live_external_ids() {
            let still_live = matches!(
                self.metadata.get_chunk(&external_id),
                Ok(Some(ref c)) if c.deleted_at.is_none()
            );
            if !still_live {
                let _ = self.hnsw.remove(&external_id);
            }
        }

        for record in self.metadata.list_live_chunks()? {
            if let Some(embedding) = &record.embedding {
                if !self.hnsw.has(&record.id) {
                    let _ = self.hnsw.add(&record.id, embedding);
                }
            }
        }

        self.indexed = self.hnsw.count() > 0;
        Ok(())
    }

    /// Insert chunks, discarding the assigned surrogate ids. Kept for
    /// callers that don't need them; see [`Self::insert_chunks_with_ids`].
    pub fn insert_chunks(&mut self, chunks: Vec<EmbeddedChunk>) -> Result<usize> {
        let ids = self.insert_chunks_with_ids(chunks)?;
        Ok(ids.len())
    }

    /// Insert chunks, committing each one's metadata row before adding it
    /// to the HNSW graph, and return their assigned surrogate ids in
    /// input order.
    pub fn insert_chunks_with_ids(&mut self, chunks: Vec<EmbeddedChunk>) -> Result<Vec<u32>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            if chunk.embedding.len() != self.dimensions {
                return Err(PrismError::dimension_mismatch(self.dimensions, chunk.embedding.len()));
            }

            let path = chunk.chunk.path.clone();
            if self.metadata.get_file(&path)?.is_none() {
                self.metadata.upsert_file(&FileRecord {
                    path: path.clone(),
                    checksum: String::new(),
                    mtime: 0,
                    size: 0,
                    language: Language::from_path(Path::new(&path)).name().to_string(),
                    indexed_at: now_ms(),
                    deleted_at: None,
                })?;
            }

            let record = embedded_chunk_to_record(chunk);
            self.metadata.upsert_chunk(&record)?;
            self.hnsw.add(&record.id, &chunk.embedding)?;

            let surrogate = self
                .metadata
                .surrogate_for_chunk(&record.id)?
                .ok_or_else(|| PrismError::storage_unavailable("chunk vanished immediately after insert"))?;
            ids.push(surrogate as u32);
        }

        self.indexed = true;
        Ok(ids)
    }

    /// Atomically retire a file's current live chunks and replace them with
    /// freshly embedded ones. The metadata-side retire+insert runs as a
    /// single SQLite transaction, so a crash partway through leaves either
    /// the file's previous chunks intact or the new set committed, never a
    /// mix. The HNSW graph is only mutated once that transaction has
    /// committed, keeping the existing metadata-then-HNSW ordering.
    pub fn replace_file_chunks(&mut self, file_path: &str, chunks: Vec<EmbeddedChunk>) -> Result<Vec<u32>> {
        for chunk in &chunks {
            if chunk.embedding.len() != self.dimensions {
                return Err(PrismError::dimension_mismatch(self.dimensions, chunk.embedding.len()));
            }
        }

        if self.metadata.get_file(file_path)?.is_none() {
            self.metadata.upsert_file(&FileRecord {
                path: file_path.to_string(),
                checksum: String::new(),
                mtime: 0,
                size: 0,
                language: Language::from_path(Path::new(file_path)).name().to_string(),
                indexed_at: now_ms(),
                deleted_at: None,
            })?;
        }

        let old_records = self.metadata.get_chunks_by_file(file_path)?;
        let records: Vec<ChunkRecord> = chunks.iter().map(embedded_chunk_to_record).collect();

        self.metadata
            .reindex_file_chunks(file_path, now_ms(), &records)
            .map_err(|e| PrismError::commit_failed(e.to_string()))?;

        for old in &old_records {
            let _ = self.hnsw.remove(&old.id);
        }
        for (record, chunk) in records.iter().zip(chunks.iter()) {
            self.hnsw.add(&record.id, &chunk.embedding)?;
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            let surrogate = self
                .metadata
                .surrogate_for_chunk(&record.id)?
                .ok_or_else(|| PrismError::storage_unavailable("chunk vanished immediately after insert"))?;
            ids.push(surrogate as u32);
        }

        self.indexed = true;
        Ok(ids)
    }

    /// No-op kept for API compatibility: the HNSW graph is built
    /// incrementally as chunks are added, so there is nothing left to
    /// build in a separate pass.
    pub fn build_index(&mut self) -> Result<()> {
        self.indexed = self.hnsw.count() > 0;
        Ok(())
    }

    /// Search for the `limit` most relevant chunks to `query_embedding`,
    /// with no filters applied.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_options(
            query_embedding,
            &SearchOptions {
                limit,
                ..Default::default()
            },
        )
    }

    /// The full filtered, re-ranked search path: over-fetch from HNSW,
    /// drop soft-deleted/missing/corrupted candidates, apply filters,
    /// re-rank, then truncate to `options.limit`.
    pub fn search_with_options(&self, query_embedding: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>> {
        if query_embedding.len() != self.dimensions {
            return Err(PrismError::dimension_mismatch(self.dimensions, query_embedding.len()));
        }

        let candidates = self.hnsw.search(query_embedding, options.limit * 2, None)?;
        let now = now_ms();
        let mut scored: Vec<(ChunkRecord, f32, f32)> = Vec::with_capacity(candidates.len());

        for (external_id, semantic_score) in candidates {
            let record = match self.metadata.get_chunk(&external_id) {
                Ok(Some(r)) if r.deleted_at.is_none() => r,
                _ => continue,
            };

            if let Some(path_filter) = &options.path_filter {
                if !record.file_path.contains(path_filter.as_str()) {
                    continue;
                }
            }
            if let Some(language_filter) = &options.language_filter {
                let file_language = Language::from_path(Path::new(&record.file_path)).name();
                if !file_language.eq_ignore_ascii_case(language_filter) {
                    continue;
                }
            }

            let score = relevance_score(semantic_score, &record, now);
            if let Some(min_relevance) = options.min_relevance {
                if score < min_relevance {
                    continue;
                }
            }

            scored.push((record, score, 1.0 - semantic_score));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(options.limit);

        let results = scored
            .iter()
            .map(|(record, score, distance)| {
                // Fire-and-forget: a failed access-count bump never blocks a query.
                let _ = self.metadata.bump_access_count(&record.id);
                record_to_search_result(record, *score, *distance)
            })
            .collect();

        Ok(results)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let stats = self.metadata.get_stats()?;
        Ok(StoreStats {
            total_chunks: stats.total_chunks,
            total_files: stats.total_files,
            indexed: self.indexed,
            dimensions: self.dimensions,
        })
    }

    /// Soft-delete chunks by their surrogate (u32) ids and tombstone them
    /// in the HNSW graph. Returns the number actually found and deleted.
    pub fn delete_chunks(&mut self, chunk_ids: &[u32]) -> Result<usize> {
        let mut deleted = 0;
        for &surrogate in chunk_ids {
            let record = match self.metadata.get_chunk_by_surrogate(surrogate as i64)? {
                Some(r) => r,
                None => continue,
            };
            self.metadata.soft_delete_chunk(&record.id, now_ms())?;
            let _ = self.hnsw.remove(&record.id);
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Soft-delete every chunk belonging to `path` and tombstone them in
    /// the HNSW graph. Returns the number of chunks removed.
    pub fn delete_by_file_path(&mut self, path: &str) -> Result<usize> {
        let records = self.metadata.get_chunks_by_file(path)?;
        for record in &records {
            let _ = self.hnsw.remove(&record.id);
        }
        self.metadata.soft_delete_chunks_by_file(path, now_ms())
    }

    /// Hard reset: drop every row and every HNSW entry.
    pub fn clear(&mut self) -> Result<()> {
        self.metadata.clear()?;
        self.hnsw = HnswIndex::new(self.hnsw.params());
        self.indexed = false;
        Ok(())
    }

    pub fn get_chunk(&self, id: u32) -> Result<Option<ChunkRecord>> {
        self.metadata.get_chunk_by_surrogate(id as i64)
    }

    /// Get a chunk as a `SearchResult` with a zero score, for hybrid
    /// search pipelines that compute relevance themselves.
    pub fn get_chunk_as_result(&self, id: u32) -> Result<Option<SearchResult>> {
        Ok(self
            .metadata
            .get_chunk_by_surrogate(id as i64)?
            .map(|record| record_to_search_result(&record, 0.0, 0.0)))
    }

    pub fn db_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(self.hnsw_index_path.parent().unwrap_or(Path::new(".")))
            .map(|m| m.len())
            .unwrap_or(0))
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Persist the HNSW graph + sidecar to disk. The metadata store is
    /// already durable after every commit; this only needs to run
    /// periodically (once per indexing run is typical) since rebuilding
    /// the graph from the metadata store is always possible as a fallback.
    pub fn save_index(&self) -> Result<()> {
        self.hnsw.save(&self.hnsw_index_path, &self.hnsw_mapping_path)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{Chunk, ChunkKind};
    use tempfile::TempDir;

    fn embedded_chunk(path: &str, content: &str, dim: usize, seed: f32) -> EmbeddedChunk {
        let chunk = Chunk::new(content.to_string(), 0, 0, ChunkKind::Function, path.to_string());
        EmbeddedChunk::new(chunk, vec![seed; dim])
    }

    #[test]
    fn insert_and_search_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut store = VectorStore::new(tmp.path(), 4).unwrap();

        let ids = store
            .insert_chunks_with_ids(vec![embedded_chunk("src/a.rs", "fn a() {}", 4, 1.0)])
            .unwrap();
        assert_eq!(ids.len(), 1);
        store.build_index().unwrap();

        let results = store.search(&[1.0, 1.0, 1.0, 1.0], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "src/a.rs");
    }

    #[test]
    fn delete_by_file_path_removes_from_search() {
        let tmp = TempDir::new().unwrap();
        let mut store = VectorStore::new(tmp.path(), 4).unwrap();
        store
            .insert_chunks_with_ids(vec![embedded_chunk("src/a.rs", "fn a() {}", 4, 1.0)])
            .unwrap();

        let removed = store.delete_by_file_path("src/a.rs").unwrap();
        assert_eq!(removed, 1);

        let results = store.search(&[1.0, 1.0, 1.0, 1.0], 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = VectorStore::new(tmp.path(), 4).unwrap();
        let err = store
            .insert_chunks_with_ids(vec![embedded_chunk("a.rs", "fn a() {}", 8, 1.0)])
            .unwrap_err();
        assert!(matches!(err, PrismError::DimensionMismatch { .. }));
    }

    #[test]
    fn save_and_reload_index_preserves_search() {
        let tmp = TempDir::new().unwrap();
        {
            let mut store = VectorStore::new(tmp.path(), 4).unwrap();
            store
                .insert_chunks_with_ids(vec![embedded_chunk("src/a.rs", "fn a() {}", 4, 1.0)])
                .unwrap();
            store.save_index().unwrap();
        }

        let store = VectorStore::new(tmp.path(), 4).unwrap();
        let results = store.search(&[1.0, 1.0, 1.0, 1.0], 5).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn clear_resets_counts() {
        let tmp = TempDir::new().unwrap();
        let mut store = VectorStore::new(tmp.path(), 4).unwrap();
        store
            .insert_chunks_with_ids(vec![embedded_chunk("src/a.rs", "fn a() {}", 4, 1.0)])
            .unwrap();
        store.clear().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_chunks, 0);
        assert!(!store.is_indexed());
    }
}

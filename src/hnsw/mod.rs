//! Approximate nearest-neighbor index over chunk embeddings, backed by
//! `hnsw_rs`. External callers only ever see opaque string ids; the dense
//! `usize` ids `hnsw_rs` actually indexes on are an internal bookkeeping
//! detail bridged by the id maps below.

use std::mem::ManuallyDrop;
use std::path::Path;

use hnsw_rs::anndists::dist::distances::DistCosine;
use hnsw_rs::hnsw::Hnsw;
use hnsw_rs::hnswio::HnswIo;
use serde::{Deserialize, Serialize};

use crate::error::{PrismError, Result};

pub const DEFAULT_DIMENSION: usize = 384;
pub const DEFAULT_M: usize = 16;
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
pub const DEFAULT_EF_SEARCH: usize = 50;
pub const DEFAULT_MAX_ELEMENTS: usize = 100_000;
const MAX_LAYER: usize = 16;
/// Past this tombstone-to-live ratio, `stats()` recommends a rebuild
/// rather than continuing to pay the search-time filtering cost.
const TOMBSTONE_REBUILD_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HnswParams {
    pub dimension: usize,
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub max_elements: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HnswStats {
    pub count: usize,
    pub tombstoned: usize,
    pub capacity: usize,
    pub rebuild_recommended: bool,
}

/// JSON sidecar persisted alongside the opaque graph file, holding
/// everything needed to reconstruct the id bridge and validate the graph
/// against a caller's expected configuration.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    dimension: usize,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    max_elements: usize,
    next_internal_id: usize,
    count: usize,
    entries: Vec<(usize, String)>,
    tombstones: Vec<usize>,
}

/// `hnsw_rs` returns a graph borrowing from the `HnswIo` it was loaded
/// through. `HnswIo` is heap-allocated and kept alive for as long as the
/// graph needs it; `Drop` tears both down in the right order.
struct LoadedGraph {
    io: *mut HnswIo,
    hnsw: ManuallyDrop<Hnsw<'static, f32, DistCosine>>,
}

impl Drop for LoadedGraph {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.hnsw);
            drop(Box::from_raw(self.io));
        }
    }
}

// `io` only ever holds file paths and buffers read at load time; all
// access to `hnsw` is serialized by `HnswIndex`'s own RwLock.
unsafe impl Send for LoadedGraph {}
unsafe impl Sync for LoadedGraph {}

enum Graph {
    Owned(Hnsw<'static, f32, DistCosine>),
    Loaded(LoadedGraph),
}

impl Graph {
    fn inner(&self) -> &Hnsw<'static, f32, DistCosine> {
        match self {
            Graph::Owned(h) => h,
            Graph::Loaded(l) => &l.hnsw,
        }
    }
}

struct IdMap {
    external_to_internal: std::collections::HashMap<String, usize>,
    internal_to_external: Vec<Option<String>>,
    tombstones: std::collections::HashSet<usize>,
    next_internal_id: usize,
}

impl IdMap {
    fn new() -> Self {
        Self {
            external_to_internal: std::collections::HashMap::new(),
            internal_to_external: Vec::new(),
            tombstones: std::collections::HashSet::new(),
            next_internal_id: 0,
        }
    }

    fn allocate(&mut self, external_id: &str) -> usize {
        let id = self.next_internal_id;
        self.next_internal_id += 1;
        self.external_to_internal.insert(external_id.to_string(), id);
        if self.internal_to_external.len() <= id {
            self.internal_to_external.resize(id + 1, None);
        }
        self.internal_to_external[id] = Some(external_id.to_string());
        id
    }
}

/// Thread-safe wrapper over an `hnsw_rs` graph plus the id bridge needed to
/// expose a string-keyed API to the rest of prism.
pub struct HnswIndex {
    params: HnswParams,
    graph: std::sync::RwLock<Graph>,
    ids: std::sync::RwLock<IdMap>,
}

impl HnswIndex {
    pub fn new(params: HnswParams) -> Self {
        let graph = Hnsw::new(params.m, params.max_elements, MAX_LAYER, params.ef_construction, DistCosine);
        Self {
            params,
            graph: std::sync::RwLock::new(Graph::Owned(graph)),
            ids: std::sync::RwLock::new(IdMap::new()),
        }
    }

    pub fn params(&self) -> HnswParams {
        self.params
    }

    fn validate_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.params.dimension {
            return Err(PrismError::dimension_mismatch(self.params.dimension, vector.len()));
        }
        Ok(())
    }

    /// Insert a single vector under `external_id`. Fails with `DuplicateId`
    /// if that id is already present (including tombstoned — a caller must
    /// `remove` first to reuse an id, though in practice prism never reuses
    /// chunk ids since they're content-addressed).
    pub fn add(&self, external_id: &str, vector: &[f32]) -> Result<()> {
        self.validate_dimension(vector)?;

        let mut ids = self.ids.write().unwrap();
        if ids.external_to_internal.contains_key(external_id) {
            return Err(PrismError::duplicate_id(external_id));
        }
        let internal_id = ids.allocate(external_id);
        drop(ids);

        let graph = self.graph.read().unwrap();
        graph.inner().insert((vector, internal_id));
        Ok(())
    }

    /// Insert a batch of (external_id, vector) pairs in order. On the
    /// first failure, stops and reports that index; everything inserted
    /// before it remains in the index.
    pub fn add_batch(&self, items: &[(String, Vec<f32>)]) -> std::result::Result<(), (usize, PrismError)> {
        for (i, (external_id, vector)) in items.iter().enumerate() {
            if let Err(e) = self.add(external_id, vector) {
                return Err((i, e));
            }
        }
        Ok(())
    }

    /// Cosine-ranked nearest neighbors, excluding tombstoned entries.
    /// Over-fetches internally since tombstones are filtered post-search.
    pub fn search(&self, vector: &[f32], k: usize, ef_override: Option<usize>) -> Result<Vec<(String, f32)>> {
        self.validate_dimension(vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let ef = ef_override.unwrap_or(self.params.ef_search).max(k);
        let ids = self.ids.read().unwrap();
        let overfetch = k + ids.tombstones.len();

        let graph = self.graph.read().unwrap();
        let neighbours = graph.inner().search_neighbours(vector, overfetch, ef);

        let mut results = Vec::with_capacity(k);
        for n in neighbours {
            if ids.tombstones.contains(&n.d_id) {
                continue;
            }
            if let Some(Some(external_id)) = ids.internal_to_external.get(n.d_id) {
                results.push((external_id.clone(), 1.0 - n.distance));
                if results.len() == k {
                    break;
                }
            }
        }

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    /// Logically remove `external_id`. `hnsw_rs` has no hard-delete, so
    /// this only tombstones — the vector still occupies graph space until
    /// a rebuild (see `stats().rebuild_recommended`).
    pub fn remove(&self, external_id: &str) -> Result<bool> {
        let mut ids = self.ids.write().unwrap();
        let internal_id = match ids.external_to_internal.get(external_id) {
            Some(id) => *id,
            None => return Ok(false),
        };
        ids.tombstones.insert(internal_id);
        Ok(true)
    }

    pub fn has(&self, external_id: &str) -> bool {
        let ids = self.ids.read().unwrap();
        match ids.external_to_internal.get(external_id) {
            Some(id) => !ids.tombstones.contains(id),
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        let ids = self.ids.read().unwrap();
        ids.external_to_internal.len() - ids.tombstones.len()
    }

    pub fn stats(&self) -> HnswStats {
        let ids = self.ids.read().unwrap();
        let total = ids.external_to_internal.len();
        let tombstoned = ids.tombstones.len();
        let ratio = if total == 0 { 0.0 } else { tombstoned as f64 / total as f64 };
        HnswStats {
            count: total - tombstoned,
            tombstoned,
            capacity: self.params.max_elements,
            rebuild_recommended: ratio > TOMBSTONE_REBUILD_THRESHOLD,
        }
    }

    /// Persist the graph and its id-bridge sidecar. The sidecar is written
    /// via temp file + rename for atomicity; `hnsw_rs`'s own `file_dump`
    /// writes its graph/data files directly (no atomic-rename option
    /// exposed by the library), so callers that need crash-safety across
    /// process restarts should treat a successful `save()` as the
    /// durability boundary and re-run indexing otherwise.
    pub fn save(&self, index_path: &Path, mapping_path: &Path) -> Result<()> {
        let dir = index_path
            .parent()
            .ok_or_else(|| PrismError::invalid_input("index path has no parent directory"))?;
        let basename = index_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PrismError::invalid_input("index path has no file stem"))?;
        std::fs::create_dir_all(dir).map_err(|e| PrismError::io(dir, e.to_string()))?;

        let graph = self.graph.read().unwrap();
        graph
            .inner()
            .file_dump(dir, basename)
            .map_err(|e| PrismError::storage_unavailable(format!("hnsw dump failed: {e}")))?;
        drop(graph);

        let ids = self.ids.read().unwrap();
        let sidecar = Sidecar {
            dimension: self.params.dimension,
            m: self.params.m,
            ef_construction: self.params.ef_construction,
            ef_search: self.params.ef_search,
            max_elements: self.params.max_elements,
            next_internal_id: ids.next_internal_id,
            count: ids.external_to_internal.len() - ids.tombstones.len(),
            entries: ids
                .internal_to_external
                .iter()
                .enumerate()
                .filter_map(|(id, ext)| ext.clone().map(|e| (id, e)))
                .collect(),
            tombstones: ids.tombstones.iter().copied().collect(),
        };
        drop(ids);

        let tmp_path = mapping_path.with_extension("json.tmp");
        {
            let file = std::fs::File::create(&tmp_path).map_err(|e| PrismError::io(&tmp_path, e.to_string()))?;
            serde_json::to_writer(std::io::BufWriter::new(file), &sidecar)
                .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        }
        std::fs::rename(&tmp_path, mapping_path).map_err(|e| PrismError::io(mapping_path, e.to_string()))?;

        Ok(())
    }

    /// Load a previously saved graph + sidecar, rejecting one whose
    /// dimension doesn't match `expected_params.dimension`.
    pub fn load(index_path: &Path, mapping_path: &Path, expected_params: HnswParams) -> Result<Self> {
        let file = std::fs::File::open(mapping_path).map_err(|e| PrismError::io(mapping_path, e.to_string()))?;
        let sidecar: Sidecar = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        if sidecar.dimension != expected_params.dimension {
            return Err(PrismError::dimension_mismatch(expected_params.dimension, sidecar.dimension));
        }

        let dir = index_path
            .parent()
            .ok_or_else(|| PrismError::invalid_input("index path has no parent directory"))?;
        let basename = index_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PrismError::invalid_input("index path has no file stem"))?;

        let io = Box::new(HnswIo::new(dir, basename));
        let io_ptr = Box::into_raw(io);

        let hnsw: Hnsw<'_, f32, DistCosine> = unsafe { &mut *io_ptr }.load_hnsw().map_err(|e| {
            unsafe {
                drop(Box::from_raw(io_ptr));
            }
            PrismError::storage_unavailable(format!("hnsw reload failed: {e}"))
        })?;

        // Safe: `io_ptr` outlives `hnsw` — `LoadedGraph::drop` tears both
        // down in that order, and nothing else touches `io_ptr` meanwhile.
        let hnsw: Hnsw<'static, f32, DistCosine> = unsafe { std::mem::transmute(hnsw) };
        let loaded = LoadedGraph {
            io: io_ptr,
            hnsw: ManuallyDrop::new(hnsw),
        };

        let mut ids = IdMap::new();
        ids.next_internal_id = sidecar.next_internal_id;
        if ids.internal_to_external.len() < sidecar.next_internal_id {
            ids.internal_to_external.resize(sidecar.next_internal_id, None);
        }
        for (internal_id, external_id) in &sidecar.entries {
            ids.external_to_internal.insert(external_id.clone(), *internal_id);
            ids.internal_to_external[*internal_id] = Some(external_id.clone());
        }
        for internal_id in &sidecar.tombstones {
            ids.tombstones.insert(*internal_id);
        }

        let params = HnswParams {
            dimension: sidecar.dimension,
            m: sidecar.m,
            ef_construction: sidecar.ef_construction,
            ef_search: sidecar.ef_search,
            max_elements: sidecar.max_elements,
        };

        Ok(Self {
            params,
            graph: std::sync::RwLock::new(Graph::Loaded(loaded)),
            ids: std::sync::RwLock::new(ids),
        })
    }

    /// External ids with a live (non-tombstoned) entry, used by the
    /// facade's load-time validation pass against the metadata store.
    pub fn live_external_ids(&self) -> Vec<String> {
        let ids = self.ids.read().unwrap();
        ids.internal_to_external
            .iter()
            .enumerate()
            .filter_map(|(id, ext)| {
                if ids.tombstones.contains(&id) {
                    None
                } else {
                    ext.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(dim: usize) -> HnswParams {
        HnswParams { dimension: dim, ..Default::default() }
    }

    #[test]
    fn add_and_search_returns_closest_first() {
        let index = HnswIndex::new(params(3));
        index.add("a", &[1.0, 0.0, 0.0]).unwrap();
        index.add("b", &[0.0, 1.0, 0.0]).unwrap();
        index.add("c", &[0.9, 0.1, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2, None).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let index = HnswIndex::new(params(2));
        index.add("a", &[1.0, 0.0]).unwrap();
        let err = index.add("a", &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, PrismError::DuplicateId { .. }));
    }

    #[test]
    fn dimension_mismatch_on_add_and_search() {
        let index = HnswIndex::new(params(3));
        assert!(matches!(
            index.add("a", &[1.0, 0.0]).unwrap_err(),
            PrismError::DimensionMismatch { .. }
        ));
        index.add("b", &[1.0, 0.0, 0.0]).unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0], 1, None).unwrap_err(),
            PrismError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn remove_is_a_tombstone_not_a_hard_delete() {
        let index = HnswIndex::new(params(2));
        index.add("a", &[1.0, 0.0]).unwrap();
        assert!(index.has("a"));
        assert!(index.remove("a").unwrap());
        assert!(!index.has("a"));
        assert_eq!(index.count(), 0);

        let results = index.search(&[1.0, 0.0], 5, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn stats_recommend_rebuild_past_threshold() {
        let index = HnswIndex::new(params(2));
        for i in 0..4 {
            index.add(&format!("id{i}"), &[i as f32, 0.0]).unwrap();
        }
        index.remove("id0").unwrap();
        assert!(!index.stats().rebuild_recommended);

        index.remove("id1").unwrap();
        assert!(index.stats().rebuild_recommended);
    }

    #[test]
    fn add_batch_reports_first_failing_index() {
        let index = HnswIndex::new(params(2));
        let items = vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("a".to_string(), vec![0.0, 1.0]),
        ];
        let err = index.add_batch(&items).unwrap_err();
        assert_eq!(err.0, 1);
    }
}

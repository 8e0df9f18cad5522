use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use crate::constants::CURRENT_SCHEMA_VERSION;
use crate::error::{PrismError, Result};

/// A tracked source file: its content fingerprint and bookkeeping for
/// incremental re-indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub checksum: String,
    pub mtime: u64,
    pub size: u64,
    pub language: String,
    pub indexed_at: u64,
    pub deleted_at: Option<u64>,
}

/// A chunk row, with its embedding materialized from the packed BLOB.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// SQLite's implicit `rowid` for this row. Stable for the row's
    /// lifetime (deletes don't renumber it), used as a dense u32-sized
    /// surrogate key by subsystems that predate content-addressed chunk
    /// ids (the full-text index, the file-metadata cache).
    pub surrogate_id: i64,
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: String,
    pub content: String,
    pub checksum: String,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub context: Vec<String>,
    pub symbols: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub dependencies: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: u64,
    pub access_count: u64,
    pub deleted_at: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct MetadataStats {
    pub total_files: usize,
    pub total_chunks: usize,
    pub chunks_by_language: std::collections::HashMap<String, usize>,
    pub last_updated: Option<u64>,
    pub estimated_size_bytes: u64,
}

/// Durable record of every tracked file and chunk, backed by a single
/// SQLite database file. Embeddings are stored as packed little-endian
/// f32 BLOBs — never JSON — to keep the on-disk footprint proportional to
/// `dimension * 4` bytes per chunk rather than several times that.
pub struct MetadataStore {
    conn: Mutex<Connection>,
    dimension: usize,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn pack_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn unpack_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn join_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

impl MetadataStore {
    /// Open (creating if absent) the metadata store at `db_path`, running
    /// any pending schema migrations before returning.
    pub fn open(db_path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PrismError::io(parent, e.to_string()))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            dimension,
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open a private in-memory store, used by tests and by ephemeral
    /// tooling (e.g. `doctor` dry-runs) that never touch disk.
    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
            dimension,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS migrations (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL,
                rollback_script TEXT
             );

             CREATE TABLE IF NOT EXISTS store_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                dimension INTEGER NOT NULL,
                created_at INTEGER NOT NULL
             );

             CREATE TABLE IF NOT EXISTS files (
                path TEXT PRIMARY KEY,
                checksum TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                size INTEGER NOT NULL,
                language TEXT NOT NULL,
                indexed_at INTEGER NOT NULL,
                deleted_at INTEGER
             );

             CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                file_path TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                checksum TEXT NOT NULL,
                signature TEXT,
                docstring TEXT,
                context TEXT NOT NULL DEFAULT '[]',
                symbols TEXT NOT NULL DEFAULT '[]',
                imports TEXT NOT NULL DEFAULT '[]',
                exports TEXT NOT NULL DEFAULT '[]',
                dependencies TEXT NOT NULL DEFAULT '[]',
                embedding BLOB,
                created_at INTEGER NOT NULL,
                access_count INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                FOREIGN KEY (file_path) REFERENCES files(path)
             );

             CREATE INDEX IF NOT EXISTS idx_chunks_file ON chunks(file_path, deleted_at);
             CREATE INDEX IF NOT EXISTS idx_files_deleted ON files(deleted_at);",
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        let existing: Option<i64> = conn
            .query_row("SELECT dimension FROM store_meta WHERE id = 1", [], |r| r.get(0))
            .optional()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (id, dimension, created_at) VALUES (1, ?1, ?2)",
                    params![self.dimension as i64, now_ms() as i64],
                )
                .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
            }
            Some(d) if d as usize != self.dimension => {
                return Err(PrismError::dimension_mismatch(self.dimension, d as usize));
            }
            Some(_) => {}
        }

        let applied: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM migrations", [], |r| {
                r.get(0)
            })
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        if (applied as u32) < CURRENT_SCHEMA_VERSION {
            conn.execute(
                "INSERT INTO migrations (version, applied_at, rollback_script) VALUES (?1, ?2, NULL)",
                params![CURRENT_SCHEMA_VERSION, now_ms() as i64],
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        } else if (applied as u32) > CURRENT_SCHEMA_VERSION {
            return Err(PrismError::SchemaMigrationRequired {
                on_disk: applied as u32,
                current: CURRENT_SCHEMA_VERSION,
            });
        }

        Ok(())
    }

    // -- files -----------------------------------------------------------

    pub fn upsert_file(&self, record: &FileRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO files (path, checksum, mtime, size, language, indexed_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(path) DO UPDATE SET
                checksum = excluded.checksum,
                mtime = excluded.mtime,
                size = excluded.size,
                language = excluded.language,
                indexed_at = excluded.indexed_at,
                deleted_at = excluded.deleted_at",
            params![
                record.path,
                record.checksum,
                record.mtime as i64,
                record.size as i64,
                record.language,
                record.indexed_at as i64,
                record.deleted_at.map(|v| v as i64),
            ],
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT path, checksum, mtime, size, language, indexed_at, deleted_at
             FROM files WHERE path = ?1",
            params![path],
            Self::row_to_file,
        )
        .optional()
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))
    }

    pub fn mark_file_deleted(&self, path: &str, ts: u64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE files SET deleted_at = ?2 WHERE path = ?1",
            params![path, ts as i64],
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(())
    }

    /// Every file not (yet) marked deleted — the set `tracked` used by the
    /// orchestrator's deletion-detection step.
    pub fn list_tracked_files(&self) -> Result<Vec<FileRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT path, checksum, mtime, size, language, indexed_at, deleted_at
                 FROM files WHERE deleted_at IS NULL",
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::row_to_file)
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
        Ok(FileRecord {
            path: row.get(0)?,
            checksum: row.get(1)?,
            mtime: row.get::<_, i64>(2)? as u64,
            size: row.get::<_, i64>(3)? as u64,
            language: row.get(4)?,
            indexed_at: row.get::<_, i64>(5)? as u64,
            deleted_at: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
        })
    }

    // -- chunks ------------------------------------------------------------

    pub fn upsert_chunk(&self, chunk: &ChunkRecord) -> Result<()> {
        if let Some(embedding) = &chunk.embedding {
            if embedding.len() != self.dimension {
                return Err(PrismError::dimension_mismatch(self.dimension, embedding.len()));
            }
        }

        let conn = self.conn.lock().unwrap();
        Self::upsert_chunk_on(&conn, chunk)
    }

    /// Same as [`Self::upsert_chunk`] but runs against an already-open
    /// connection or transaction, so callers that need several chunk
    /// writes to commit as one unit can share a `rusqlite::Transaction`.
    fn upsert_chunk_on(conn: &Connection, chunk: &ChunkRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO chunks (
                id, file_path, start_line, end_line, kind, content, checksum,
                signature, docstring, context, symbols, imports, exports, dependencies,
                embedding, created_at, access_count, deleted_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)
             ON CONFLICT(id) DO UPDATE SET
                file_path = excluded.file_path,
                start_line = excluded.start_line,
                end_line = excluded.end_line,
                kind = excluded.kind,
                content = excluded.content,
                checksum = excluded.checksum,
                signature = excluded.signature,
                docstring = excluded.docstring,
                context = excluded.context,
                symbols = excluded.symbols,
                imports = excluded.imports,
                exports = excluded.exports,
                dependencies = excluded.dependencies,
                embedding = excluded.embedding,
                deleted_at = excluded.deleted_at",
            params![
                chunk.id,
                chunk.file_path,
                chunk.start_line as i64,
                chunk.end_line as i64,
                chunk.kind,
                chunk.content,
                chunk.checksum,
                chunk.signature,
                chunk.docstring,
                join_list(&chunk.context),
                join_list(&chunk.symbols),
                join_list(&chunk.imports),
                join_list(&chunk.exports),
                join_list(&chunk.dependencies),
                chunk.embedding.as_ref().map(|v| pack_embedding(v)),
                chunk.created_at as i64,
                chunk.access_count as i64,
                chunk.deleted_at.map(|v| v as i64),
            ],
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(())
    }

    /// Retire a file's current live chunks and insert its freshly extracted
    /// ones as a single SQLite transaction — a crash partway through leaves
    /// either the old set intact or the new set committed, never a mix.
    pub fn reindex_file_chunks(&self, file_path: &str, ts: u64, new_chunks: &[ChunkRecord]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        let retired = tx
            .execute(
                "UPDATE chunks SET deleted_at = ?2 WHERE file_path = ?1 AND deleted_at IS NULL",
                params![file_path, ts as i64],
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        for chunk in new_chunks {
            if let Some(embedding) = &chunk.embedding {
                if embedding.len() != self.dimension {
                    return Err(PrismError::dimension_mismatch(self.dimension, embedding.len()));
                }
            }
            Self::upsert_chunk_on(&tx, chunk)?;
        }

        tx.commit().map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(retired)
    }

    pub fn get_chunk(&self, id: &str) -> Result<Option<ChunkRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT rowid, id, file_path, start_line, end_line, kind, content, checksum,
                        signature, docstring, context, symbols, imports, exports, dependencies,
                        embedding, created_at, access_count, deleted_at
                 FROM chunks WHERE id = ?1",
                params![id],
                Self::row_to_chunk,
            )
            .optional()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        if let Some(record) = &record {
            self.verify_checksum(record)?;
        }
        Ok(record)
    }

    /// Look up a chunk by its `rowid`-derived surrogate key, for callers
    /// (the FTS index, the file-metadata cache) that only know u32 ids.
    pub fn get_chunk_by_surrogate(&self, surrogate_id: i64) -> Result<Option<ChunkRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT rowid, id, file_path, start_line, end_line, kind, content, checksum,
                        signature, docstring, context, symbols, imports, exports, dependencies,
                        embedding, created_at, access_count, deleted_at
                 FROM chunks WHERE rowid = ?1",
                params![surrogate_id],
                Self::row_to_chunk,
            )
            .optional()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        if let Some(record) = &record {
            self.verify_checksum(record)?;
        }
        Ok(record)
    }

    pub fn surrogate_for_chunk(&self, id: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT rowid FROM chunks WHERE id = ?1", params![id], |r| r.get(0))
            .optional()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))
    }

    pub fn get_chunks_by_file(&self, path: &str) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT rowid, id, file_path, start_line, end_line, kind, content, checksum,
                        signature, docstring, context, symbols, imports, exports, dependencies,
                        embedding, created_at, access_count, deleted_at
                 FROM chunks WHERE file_path = ?1 AND deleted_at IS NULL",
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        let rows = stmt
            .query_map(params![path], Self::row_to_chunk)
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))
    }

    /// Every non-deleted chunk, used by the facade's startup reconciliation
    /// pass to find chunks missing from the HNSW graph.
    pub fn list_live_chunks(&self) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT rowid, id, file_path, start_line, end_line, kind, content, checksum,
                        signature, docstring, context, symbols, imports, exports, dependencies,
                        embedding, created_at, access_count, deleted_at
                 FROM chunks WHERE deleted_at IS NULL",
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::row_to_chunk)
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))
    }

    pub fn soft_delete_chunk(&self, id: &str, ts: u64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE chunks SET deleted_at = ?2 WHERE id = ?1",
            params![id, ts as i64],
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(())
    }

    pub fn soft_delete_chunks_by_file(&self, path: &str, ts: u64) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = conn
            .execute(
                "UPDATE chunks SET deleted_at = ?2 WHERE file_path = ?1 AND deleted_at IS NULL",
                params![path, ts as i64],
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(n)
    }

    /// Increment a chunk's access counter. Best-effort: failures are
    /// swallowed by the caller (the facade), never propagated to a query.
    pub fn bump_access_count(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE chunks SET access_count = access_count + 1 WHERE id = ?1",
            params![id],
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(())
    }

    fn verify_checksum(&self, record: &ChunkRecord) -> Result<()> {
        let expected = crate::checksum::file_checksum(record.content.as_bytes());
        if expected != record.checksum {
            return Err(PrismError::corrupted_entry(format!(
                "chunk {} checksum mismatch (stored {}, recomputed {})",
                record.id, record.checksum, expected
            )));
        }
        Ok(())
    }

    fn row_to_chunk(row: &rusqlite::Row) -> rusqlite::Result<ChunkRecord> {
        let context_raw: String = row.get(10)?;
        let symbols_raw: String = row.get(11)?;
        let imports_raw: String = row.get(12)?;
        let exports_raw: String = row.get(13)?;
        let dependencies_raw: String = row.get(14)?;
        let embedding_raw: Option<Vec<u8>> = row.get(15)?;

        Ok(ChunkRecord {
            surrogate_id: row.get(0)?,
            id: row.get(1)?,
            file_path: row.get(2)?,
            start_line: row.get::<_, i64>(3)? as usize,
            end_line: row.get::<_, i64>(4)? as usize,
            kind: row.get(5)?,
            content: row.get(6)?,
            checksum: row.get(7)?,
            signature: row.get(8)?,
            docstring: row.get(9)?,
            context: split_list(&context_raw),
            symbols: split_list(&symbols_raw),
            imports: split_list(&imports_raw),
            exports: split_list(&exports_raw),
            dependencies: split_list(&dependencies_raw),
            embedding: embedding_raw.map(|b| unpack_embedding(&b)),
            created_at: row.get::<_, i64>(16)? as u64,
            access_count: row.get::<_, i64>(17)? as u64,
            deleted_at: row.get::<_, Option<i64>>(18)?.map(|v| v as u64),
        })
    }

    // -- maintenance -------------------------------------------------------

    pub fn get_stats(&self) -> Result<MetadataStats> {
        let conn = self.conn.lock().unwrap();

        let total_files: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM files WHERE deleted_at IS NULL",
                [],
                |r| r.get(0),
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        let total_chunks: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE deleted_at IS NULL",
                [],
                |r| r.get(0),
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        let last_updated: Option<i64> = conn
            .query_row("SELECT MAX(indexed_at) FROM files", [], |r| r.get(0))
            .optional()
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?
            .flatten();

        let estimated_size_bytes: i64 = conn
            .query_row("SELECT COALESCE(SUM(size), 0) FROM files WHERE deleted_at IS NULL", [], |r| r.get(0))
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        let mut chunks_by_language = std::collections::HashMap::new();
        {
            let mut stmt = conn
                .prepare(
                    "SELECT f.language, COUNT(*) FROM chunks c
                     JOIN files f ON f.path = c.file_path
                     WHERE c.deleted_at IS NULL
                     GROUP BY f.language",
                )
                .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as usize)))
                .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
            for row in rows {
                let (lang, count) = row.map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
                chunks_by_language.insert(lang, count);
            }
        }

        Ok(MetadataStats {
            total_files: total_files as usize,
            total_chunks: total_chunks as usize,
            chunks_by_language,
            last_updated: last_updated.map(|v| v as u64),
            estimated_size_bytes: estimated_size_bytes as u64,
        })
    }

    /// Hard-delete rows soft-deleted before `now - retention_ms`, then
    /// reclaim space. Unlike the soft-delete path this is destructive and
    /// intended to be run offline/periodically, not on the query path.
    pub fn vacuum(&self, retention_ms: u64) -> Result<usize> {
        let cutoff = now_ms().saturating_sub(retention_ms) as i64;
        let conn = self.conn.lock().unwrap();

        let chunks_removed = conn
            .execute(
                "DELETE FROM chunks WHERE deleted_at IS NOT NULL AND deleted_at < ?1",
                params![cutoff],
            )
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        conn.execute(
            "DELETE FROM files WHERE deleted_at IS NOT NULL AND deleted_at < ?1
             AND NOT EXISTS (SELECT 1 FROM chunks WHERE chunks.file_path = files.path)",
            params![cutoff],
        )
        .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        conn.execute_batch("VACUUM;")
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;

        Ok(chunks_removed)
    }

    /// Hard reset: drop every file and chunk row, keeping the schema.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("DELETE FROM chunks; DELETE FROM files;")
            .map_err(|e| PrismError::storage_unavailable(e.to_string()))?;
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file(path: &str) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            checksum: "abc".to_string(),
            mtime: 1,
            size: 100,
            language: "rust".to_string(),
            indexed_at: 1,
            deleted_at: None,
        }
    }

    fn sample_chunk(id: &str, file_path: &str, dimension: usize) -> ChunkRecord {
        let content = format!("fn {id}() {{}}");
        ChunkRecord {
            surrogate_id: 0,
            id: id.to_string(),
            file_path: file_path.to_string(),
            start_line: 0,
            end_line: 0,
            kind: "function".to_string(),
            checksum: crate::checksum::file_checksum(content.as_bytes()),
            content,
            signature: None,
            docstring: None,
            context: vec![],
            symbols: vec![],
            imports: vec![],
            exports: vec![],
            dependencies: vec![],
            embedding: Some(vec![0.1; dimension]),
            created_at: 1,
            access_count: 0,
            deleted_at: None,
        }
    }

    #[test]
    fn upsert_and_get_file_round_trip() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        let file = sample_file("src/lib.rs");
        store.upsert_file(&file).unwrap();

        let fetched = store.get_file("src/lib.rs").unwrap().unwrap();
        assert_eq!(fetched, file);
    }

    #[test]
    fn upsert_and_get_chunk_round_trip() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        let chunk = sample_chunk("c1", "a.rs", 4);
        store.upsert_chunk(&chunk).unwrap();

        let fetched = store.get_chunk("c1").unwrap().unwrap();
        assert_eq!(fetched.content, chunk.content);
        assert_eq!(fetched.embedding, chunk.embedding);
    }

    #[test]
    fn dimension_mismatch_on_insert_is_rejected() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        let bad = sample_chunk("c1", "a.rs", 8);
        let err = store.upsert_chunk(&bad).unwrap_err();
        assert!(matches!(err, PrismError::DimensionMismatch { .. }));
    }

    #[test]
    fn corrupted_checksum_is_detected_on_read() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        let mut chunk = sample_chunk("c1", "a.rs", 4);
        chunk.checksum = "deadbeef".to_string();
        store.upsert_chunk(&chunk).unwrap();

        let err = store.get_chunk("c1").unwrap_err();
        assert!(matches!(err, PrismError::CorruptedEntry { .. }));
    }

    #[test]
    fn soft_delete_by_file_hides_chunks_but_keeps_rows() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        store.upsert_chunk(&sample_chunk("c1", "a.rs", 4)).unwrap();
        store.upsert_chunk(&sample_chunk("c2", "a.rs", 4)).unwrap();

        let removed = store.soft_delete_chunks_by_file("a.rs", 100).unwrap();
        assert_eq!(removed, 2);
        assert!(store.get_chunks_by_file("a.rs").unwrap().is_empty());
    }

    #[test]
    fn list_tracked_files_excludes_deleted() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        store.upsert_file(&sample_file("b.rs")).unwrap();
        store.mark_file_deleted("a.rs", 50).unwrap();

        let tracked = store.list_tracked_files().unwrap();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].path, "b.rs");
    }

    #[test]
    fn vacuum_hard_deletes_old_tombstones() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        let mut chunk = sample_chunk("c1", "a.rs", 4);
        chunk.deleted_at = Some(1);
        store.upsert_chunk(&chunk).unwrap();

        let removed = store.vacuum(0).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_chunk("c1").unwrap().is_none());
    }

    #[test]
    fn stats_reports_totals() {
        let store = MetadataStore::open_in_memory(4).unwrap();
        store.upsert_file(&sample_file("a.rs")).unwrap();
        store.upsert_chunk(&sample_chunk("c1", "a.rs", 4)).unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.chunks_by_language.get("rust"), Some(&1));
    }
}

//! SQLite-backed metadata store: the durable record of every tracked file
//! and chunk, including each chunk's embedding as a packed float BLOB.
//!
//! This is the source of truth the HNSW index is rebuilt from if its
//! sidecar ever disagrees with it; the HNSW graph itself holds no data
//! that doesn't also live here.

mod sqlite;

pub use sqlite::{ChunkRecord, FileRecord, MetadataStats, MetadataStore};

//! Central constants for prism configuration
//!
//! All string literals for paths, filenames, and configuration should be defined here
//! to avoid duplication and ensure consistency across the codebase.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

/// Name of the database directory in project roots
pub const DB_DIR_NAME: &str = ".prism.db";

/// Name of the global config directory in user home
pub const CONFIG_DIR_NAME: &str = ".prism";

/// Name of the file metadata database
pub const FILE_META_DB_NAME: &str = "file_meta.json";

/// Name of fastembed cache directory (inside .prism.db)
pub const FASTEMBED_CACHE_DIR: &str = "fastembed_cache";

/// Name of the repos configuration file
pub const REPOS_CONFIG_FILE: &str = "repos.json";

/// File watcher debounce time in milliseconds
pub const DEFAULT_FSW_DEBOUNCE_MS: u64 = 2000;

/// Lock file name to indicate an active writer instance
/// This prevents multiple processes from writing to the same database
pub const WRITER_LOCK_FILE: &str = ".writer.lock";

/// Name of the SQLite metadata store file (inside the database directory)
pub const METADATA_DB_NAME: &str = "metadata.sqlite3";

/// Name of the HNSW graph sidecar directory (inside the database directory)
pub const HNSW_DIR_NAME: &str = "hnsw";

/// Filename of the HNSW bidirectional id-map + parameter sidecar (JSON)
pub const HNSW_SIDECAR_FILE: &str = "hnsw.json";

/// Filename of the opaque HNSW graph file written by the ANN library
pub const HNSW_GRAPH_FILE: &str = "hnsw.graph";

/// Name of the logging subdirectory inside the database directory
pub const LOG_DIR_NAME: &str = "logs";

/// Base filename for the rolling log file (date suffix appended by the appender)
pub const LOG_FILE_NAME: &str = "prism.log";

/// Default number of rotated log files retained before the oldest is pruned
pub const DEFAULT_LOG_MAX_FILES: usize = 14;

/// Default size in megabytes at which a log file is rotated
pub const DEFAULT_LOG_MAX_SIZE_MB: u64 = 50;

/// Default number of days rotated logs are kept before cleanup deletes them
pub const DEFAULT_LOG_RETENTION_DAYS: u64 = 14;

/// Default in-memory embedding/query cache ceiling, in megabytes
pub const DEFAULT_CACHE_MAX_MEMORY_MB: u64 = 256;

/// Default SQLite metadata store mmap/cache hint size, in megabytes.
/// Unlike an LMDB map size this is advisory (`PRAGMA mmap_size`), not a
/// hard ceiling on database growth.
pub const DEFAULT_SQLITE_MMAP_SIZE_MB: u64 = 512;

/// Default number of files processed between periodic ONNX Runtime arena
/// resets during a long indexing run.
pub const DEFAULT_ARENA_RESET_INTERVAL: usize = 500;

/// Current on-disk schema version for the metadata store and HNSW sidecar.
/// Bump when the row/sidecar layout changes in an incompatible way.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Set by the CTRL-C handler; polled by long-running loops (indexing,
/// file watching) as a coarse, synchronous-context-friendly cancellation
/// signal alongside the async `CancellationToken`.
pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Returns whether a graceful shutdown has been requested.
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(std::sync::atomic::Ordering::SeqCst)
}

/// Directory used to cache downloaded embedding models across all indexed
/// projects, defaulting to a location under the user's cache/home
/// directory rather than per-project.
pub fn get_global_models_cache_dir() -> PathBuf {
    if let Ok(custom) = std::env::var("PRISM_MODELS_CACHE_DIR") {
        return PathBuf::from(custom);
    }
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(FASTEMBED_CACHE_DIR)
}

/// Directories and files that should always be excluded from indexing
/// These are added to both .gitignore and .prismignore automatically
pub const ALWAYS_EXCLUDED: &[&str] = &[
    // Prism databases
    ".prism",
    ".prism.db",
    ".prism.dbs",
    // Fastembed cache
    "fastembed_cache",
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Build artifacts
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    // Python
    "__pycache__",
    ".pytest_cache",
    ".tox",
    "venv",
    ".venv",
    // Ruby
    "vendor",
    ".bundle",
    // Java
    ".gradle",
    ".m2",
    // IDE
    ".idea",
    ".vscode",
    ".vs",
    // Other
    "coverage",
    ".nyc_output",
    ".cache",
];

//! Centralized error types for prism
//!
//! Every fallible operation across the crate returns [`Result<T>`], a thin
//! alias over [`PrismError`]. Variants are grouped by the subsystem that
//! raises them; storage-layer variants mirror the failure taxonomy the
//! metadata store and HNSW index are contractually required to surface
//! (invalid input, corruption, capacity exhaustion, provider failure).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for prism operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// Database-related errors (SQLite metadata store).
    #[error("Database error: {message}")]
    Database {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// I/O operation errors.
    #[error("I/O error: {path} - {message}")]
    Io {
        path: PathBuf,
        message: String,
        source: Option<anyhow::Error>,
    },

    /// Embedding model errors.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Search operation errors.
    #[error("Search error: {message}")]
    Search { message: String },

    /// Index operation errors.
    #[error("Index error: {message}")]
    Index { message: String },

    /// Configuration errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// MCP server errors.
    #[error("MCP error: {message}")]
    Mcp { message: String },

    /// File parsing errors.
    #[error("Parse error: {path} - {message}")]
    Parse {
        path: PathBuf,
        message: String,
        source: Option<anyhow::Error>,
    },

    /// Validation errors.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A caller-supplied argument violates a precondition (bad vector
    /// dimension at the call site, empty path, out-of-range offset).
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A vector's dimensionality does not match the index's configured
    /// dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An insert specified an id already present and not tombstoned.
    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    /// The backing store (SQLite file, HNSW graph file) could not be
    /// opened or is not reachable.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// A persisted record failed to deserialize or its checksum did not
    /// match its content.
    #[error("Corrupted entry: {message}")]
    CorruptedEntry { message: String },

    /// A cross-artifact consistency check failed (metadata row with no
    /// vector, HNSW id with no backing row, tombstone mismatch).
    #[error("Integrity violation: {message}")]
    IntegrityViolation { message: String },

    /// On-disk schema version does not match what this build expects and
    /// cannot be migrated automatically.
    #[error("Schema mismatch: on-disk version {on_disk}, expected {expected}")]
    SchemaMismatch { on_disk: u32, expected: u32 },

    /// On-disk schema is older than current and requires an explicit
    /// migration step before the store can be opened.
    #[error("Schema migration required: on-disk version {on_disk}, current {current}")]
    SchemaMigrationRequired { on_disk: u32, current: u32 },

    /// The embedding collaborator is not reachable (model not loaded,
    /// remote provider down).
    #[error("Embedding provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// The embedding collaborator rejected a request due to rate limiting.
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// An operation exceeded its allotted time budget.
    #[error("Timeout: {message}")]
    Timeout { message: String },

    /// A multi-artifact commit could not be made durable; the caller must
    /// treat the affected file as not-yet-indexed and retry.
    #[error("Commit failed: {message}")]
    CommitFailed { message: String },
}

impl PrismError {
    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a search error
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    /// Create an index error
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an MCP error
    pub fn mcp(message: impl Into<String>) -> Self {
        Self::Mcp {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid-input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a dimension-mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a duplicate-id error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create a storage-unavailable error
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Create a corrupted-entry error
    pub fn corrupted_entry(message: impl Into<String>) -> Self {
        Self::CorruptedEntry {
            message: message.into(),
        }
    }

    /// Create an integrity-violation error
    pub fn integrity_violation(message: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            message: message.into(),
        }
    }

    /// Create a commit-failed error
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::CommitFailed {
            message: message.into(),
        }
    }

    /// Whether this error reflects a caller mistake rather than a system
    /// fault — callers use this to decide whether retrying makes sense.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::DimensionMismatch { .. }
                | Self::DuplicateId { .. }
                | Self::Validation { .. }
        )
    }

    /// Whether the failed operation is safe to retry as-is (transient
    /// provider/storage conditions, as opposed to a structural mismatch).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Timeout { .. }
                | Self::ProviderUnavailable { .. }
                | Self::StorageUnavailable { .. }
        )
    }
}

/// Result type alias for prism operations
pub type Result<T> = std::result::Result<T, PrismError>;

// Conversion from std::io::Error
impl From<std::io::Error> for PrismError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            message: err.to_string(),
            source: None,
        }
    }
}

// Conversion from anyhow::Error (for gradual migration)
impl From<anyhow::Error> for PrismError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// Conversion from rusqlite errors raised by the metadata store.
impl From<rusqlite::Error> for PrismError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageUnavailable {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PrismError::database("Test error");
        assert!(err.to_string().contains("Database error"));

        let err = PrismError::validation("Invalid input");
        assert!(err.to_string().contains("Validation error"));
    }

    #[test]
    fn test_io_error() {
        let path = PathBuf::from("/test/path");
        let err = PrismError::io(&path, "File not found");
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("/test/path"));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = PrismError::dimension_mismatch(384, 256);
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains("256"));
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_caller_vs_retryable() {
        assert!(PrismError::invalid_input("bad").is_caller_error());
        assert!(!PrismError::invalid_input("bad").is_retryable());
        assert!(PrismError::Timeout {
            message: "slow".into()
        }
        .is_retryable());
    }
}
